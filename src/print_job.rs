//! CTB print job encoding.
//!
//! Layout, all fields little-endian:
//!
//! | section        | size              |
//! |----------------|-------------------|
//! | header         | 512 bytes         |
//! | layer table    | 16 bytes / layer  |
//! | layer payloads | zlib streams      |
//! | preview header | 8 bytes           |
//! | preview raster | 128 x 128 bytes   |
//!
//! Every offset stored in the file is the absolute position of the payload it describes.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{GrayImage, Luma};
use log::{debug, info};
use thiserror::Error;

use crate::config::PrinterProfile;
use crate::output::write_atomically;

pub const MAGIC: [u8; 4] = *b"CTB\0";
pub const VERSION: u32 = 4;
pub const HEADER_SIZE: usize = 0x200;
pub const LAYER_RECORD_SIZE: usize = 16;
pub const PREVIEW_HEADER_SIZE: usize = 8;
pub const PREVIEW_DIMENSION: u32 = 128;
pub const PREVIEW_GREY: u8 = 180;

/// Pixels with a luma below this are exposed.
pub const EXPOSURE_THRESHOLD: u8 = 128;

#[derive(Error, Debug)]
pub enum PrintJobError {
    #[error("Bitmap size mismatch, expected: {expected:?}, actual: {actual:?}")]
    DimensionMismatch { expected: (u32, u32), actual: (u32, u32) },
    #[error("No layers")]
    NoLayers,
    #[error("Malformed print job: {0}")]
    Malformed(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn malformed(message: impl Into<String>) -> PrintJobError {
    PrintJobError::Malformed(message.into())
}

/// Number of bytes a packed row of `width` pixels occupies.
pub fn packed_row_length(width: u32) -> usize {
    (width as usize).div_ceil(8)
}

/// Packs a bitmap row by row, 8 pixels per byte, most significant bit first. An exposed pixel sets its bit; the last
/// byte of a row is zero-padded when the width is not a multiple of 8.
pub fn pack_bitmap(image: &GrayImage) -> Vec<u8> {
    let row_length = packed_row_length(image.width());
    let mut packed = vec![0u8; row_length * image.height() as usize];

    for (x, y, Luma([luma])) in image.enumerate_pixels() {
        if *luma < EXPOSURE_THRESHOLD {
            let index = y as usize * row_length + x as usize / 8;
            packed[index] |= 0x80 >> (x % 8);
        }
    }

    packed
}

/// Reverses [`pack_bitmap`]: exposed pixels become black, the others white.
pub fn unpack_bitmap(packed: &[u8], width: u32, height: u32) -> Result<GrayImage, PrintJobError> {
    let row_length = packed_row_length(width);
    let expected = row_length * height as usize;
    if packed.len() != expected {
        return Err(malformed(format!(
            "packed bitmap length {} does not match {}x{} ({} bytes)",
            packed.len(),
            width,
            height,
            expected
        )));
    }

    Ok(GrayImage::from_fn(width, height, |x, y| {
        let byte = packed[y as usize * row_length + x as usize / 8];
        match byte & (0x80 >> (x % 8)) {
            0 => Luma([255]),
            _ => Luma([0]),
        }
    }))
}

fn compress(data: &[u8]) -> Result<Vec<u8>, PrintJobError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, PrintJobError> {
    let mut decoded = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut decoded)?;
    Ok(decoded)
}

fn to_u32(value: usize, what: &str) -> Result<u32, PrintJobError> {
    u32::try_from(value).map_err(|_| malformed(format!("{} does not fit 32 bits: {}", what, value)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintJobHeader {
    pub version: u32,
    pub header_size: u32,
    pub width: u32,
    pub height: u32,
    /// mm
    pub pixel_size: f32,
    /// mm
    pub layer_height: f32,
    /// seconds
    pub exposure: f32,
    pub layer_count: u32,
    pub layer_table_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerRecord {
    pub offset: u32,
    pub compressed_length: u32,
    pub raw_length: u32,
    /// seconds
    pub exposure: f32,
}

/// A decoded print job; used to verify written files.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub header: PrintJobHeader,
    pub layers: Vec<LayerRecord>,
    /// Compressed payload of each layer
    pub payloads: Vec<Vec<u8>>,
    pub preview_offset: u32,
    pub preview: Vec<u8>,
}

impl PrintJob {
    pub fn parse(bytes: &[u8]) -> Result<Self, PrintJobError> {
        if bytes.len() < HEADER_SIZE {
            return Err(malformed(format!("file too short for a header: {} bytes", bytes.len())));
        }
        if bytes[..4] != MAGIC {
            return Err(malformed("bad magic"));
        }

        let mut cursor = Cursor::new(&bytes[4..]);
        let header = PrintJobHeader {
            version: cursor.read_u32::<LittleEndian>()?,
            header_size: cursor.read_u32::<LittleEndian>()?,
            width: cursor.read_u32::<LittleEndian>()?,
            height: cursor.read_u32::<LittleEndian>()?,
            pixel_size: cursor.read_f32::<LittleEndian>()?,
            layer_height: cursor.read_f32::<LittleEndian>()?,
            exposure: cursor.read_f32::<LittleEndian>()?,
            layer_count: cursor.read_u32::<LittleEndian>()?,
            layer_table_offset: cursor.read_u32::<LittleEndian>()?,
        };

        let table_start = header.layer_table_offset as usize;
        let table_end = table_start + header.layer_count as usize * LAYER_RECORD_SIZE;
        let table = bytes
            .get(table_start..table_end)
            .ok_or_else(|| malformed("layer table out of bounds"))?;

        let mut cursor = Cursor::new(table);
        let mut layers = Vec::with_capacity(header.layer_count as usize);
        let mut payloads = Vec::with_capacity(header.layer_count as usize);
        let mut payload_end = table_end;
        for index in 0..header.layer_count {
            let record = LayerRecord {
                offset: cursor.read_u32::<LittleEndian>()?,
                compressed_length: cursor.read_u32::<LittleEndian>()?,
                raw_length: cursor.read_u32::<LittleEndian>()?,
                exposure: cursor.read_f32::<LittleEndian>()?,
            };
            let start = record.offset as usize;
            let end = start + record.compressed_length as usize;
            let payload = bytes
                .get(start..end)
                .ok_or_else(|| malformed(format!("layer {} payload out of bounds", index)))?;

            payloads.push(payload.to_vec());
            layers.push(record);
            payload_end = payload_end.max(end);
        }

        let mut cursor = Cursor::new(
            bytes
                .get(payload_end..)
                .ok_or_else(|| malformed("missing preview header"))?,
        );
        let preview_offset = cursor.read_u32::<LittleEndian>()?;
        let preview_length = cursor.read_u32::<LittleEndian>()?;
        let preview = bytes
            .get(preview_offset as usize..preview_offset as usize + preview_length as usize)
            .ok_or_else(|| malformed("preview out of bounds"))?
            .to_vec();

        Ok(Self {
            header,
            layers,
            payloads,
            preview_offset,
            preview,
        })
    }

    /// The packed bitmap of a layer.
    pub fn layer_bitmap(&self, index: usize) -> Result<Vec<u8>, PrintJobError> {
        let payload = self
            .payloads
            .get(index)
            .ok_or_else(|| malformed(format!("no layer {}", index)))?;
        let bitmap = decompress(payload)?;
        if bitmap.len() != self.layers[index].raw_length as usize {
            return Err(malformed(format!(
                "layer {} decoded to {} bytes, recorded: {}",
                index,
                bitmap.len(),
                self.layers[index].raw_length
            )));
        }
        Ok(bitmap)
    }

    pub fn layer_image(&self, index: usize) -> Result<GrayImage, PrintJobError> {
        unpack_bitmap(&self.layer_bitmap(index)?, self.header.width, self.header.height)
    }
}

fn validate_dimensions(layers: &[&GrayImage], profile: &PrinterProfile) -> Result<(), PrintJobError> {
    if layers.is_empty() {
        return Err(PrintJobError::NoLayers);
    }

    let expected = (profile.width_px, profile.height_px);
    for layer in layers {
        let actual = layer.dimensions();
        if actual != expected {
            return Err(PrintJobError::DimensionMismatch { expected, actual });
        }
    }
    Ok(())
}

/// Encodes any number of layers of the printer's resolution, all with the profile's exposure.
#[profiling::function]
pub fn encode_layers(layers: &[&GrayImage], profile: &PrinterProfile) -> Result<Vec<u8>, PrintJobError> {
    validate_dimensions(layers, profile)?;

    let bitmaps: Vec<Vec<u8>> = layers
        .iter()
        .map(|layer| pack_bitmap(layer))
        .collect();
    let compressed = bitmaps
        .iter()
        .map(|bitmap| compress(bitmap))
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(
        HEADER_SIZE
            + layers.len() * LAYER_RECORD_SIZE
            + compressed.iter().map(Vec::len).sum::<usize>()
            + PREVIEW_HEADER_SIZE
            + (PREVIEW_DIMENSION * PREVIEW_DIMENSION) as usize,
    );

    out.write_all(&MAGIC)?;
    out.write_u32::<LittleEndian>(VERSION)?;
    out.write_u32::<LittleEndian>(HEADER_SIZE as u32)?;
    out.write_u32::<LittleEndian>(profile.width_px)?;
    out.write_u32::<LittleEndian>(profile.height_px)?;
    out.write_f32::<LittleEndian>(profile.pixel_size)?;
    out.write_f32::<LittleEndian>(profile.layer_height)?;
    out.write_f32::<LittleEndian>(profile.exposure)?;
    out.write_u32::<LittleEndian>(to_u32(layers.len(), "layer count")?)?;
    out.write_u32::<LittleEndian>(HEADER_SIZE as u32)?;
    out.resize(HEADER_SIZE, 0);

    let mut offset = HEADER_SIZE + layers.len() * LAYER_RECORD_SIZE;
    for (bitmap, payload) in bitmaps.iter().zip(&compressed) {
        out.write_u32::<LittleEndian>(to_u32(offset, "layer offset")?)?;
        out.write_u32::<LittleEndian>(to_u32(payload.len(), "compressed length")?)?;
        out.write_u32::<LittleEndian>(to_u32(bitmap.len(), "raw length")?)?;
        out.write_f32::<LittleEndian>(profile.exposure)?;
        offset += payload.len();
    }
    for payload in &compressed {
        out.write_all(payload)?;
    }

    let preview = GrayImage::from_pixel(PREVIEW_DIMENSION, PREVIEW_DIMENSION, Luma([PREVIEW_GREY])).into_raw();
    out.write_u32::<LittleEndian>(to_u32(out.len() + PREVIEW_HEADER_SIZE, "preview offset")?)?;
    out.write_u32::<LittleEndian>(to_u32(preview.len(), "preview length")?)?;
    out.write_all(&preview)?;

    debug!(
        "encoded {} layer(s), payloads: {:?}, total: {} bytes",
        layers.len(),
        compressed.iter().map(Vec::len).collect::<Vec<_>>(),
        out.len()
    );

    Ok(out)
}

/// Encodes the two-layer job: the front layer first, then the back layer.
pub fn encode_front_back(front: &GrayImage, back: &GrayImage, profile: &PrinterProfile) -> Result<Vec<u8>, PrintJobError> {
    encode_layers(&[front, back], profile)
}

/// Loads an image as 8-bit luma.
pub fn load_bitmap(path: &Path) -> Result<GrayImage, PrintJobError> {
    Ok(image::open(path)?.to_luma8())
}

/// Loads the front and back images, encodes them and writes the job to `out_path`. Nothing is written when either
/// image has the wrong size.
pub fn write_ctb(front_path: &Path, back_path: &Path, out_path: &Path, profile: &PrinterProfile) -> Result<(), PrintJobError> {
    let front = load_bitmap(front_path)?;
    let back = load_bitmap(back_path)?;

    let bytes = encode_front_back(&front, &back, profile)?;
    write_atomically(out_path, &bytes)?;

    info!("CTB written, path: {}, bytes: {}", out_path.display(), bytes.len());
    Ok(())
}
