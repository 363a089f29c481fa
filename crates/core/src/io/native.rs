//! Native GeoTIFF band I/O, built on the `tiff` crate.
//!
//! Bands are always read as `f64`. The GDAL nodata tag, when present, is
//! honoured by turning matching cells into `NaN`, so that every raster
//! reaching the pipeline uses `NaN` as its only "no data" marker.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

/// Read the first band of a GeoTIFF file
pub fn read_band<P: AsRef<Path>>(path: P) -> Result<Raster<f64>> {
    let file = File::open(path.as_ref())?;
    decode_band(BufReader::new(file))
}

/// Read the first band of an in-memory GeoTIFF
pub fn read_band_from_buffer(data: &[u8]) -> Result<Raster<f64>> {
    decode_band(Cursor::new(data))
}

fn decode_band<R: Read + Seek>(reader: R) -> Result<Raster<f64>> {
    let mut decoder = Decoder::new(reader)?;

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let data: Vec<f64> = match decoder.read_image()? {
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        _ => return Err(Error::UnsupportedDataType("unsupported TIFF pixel format".to_string())),
    };

    // Multi-sample images decode interleaved; keep the first sample
    let samples = data.len() / (rows * cols).max(1);
    let data: Vec<f64> = if samples > 1 {
        data.into_iter().step_by(samples).collect()
    } else {
        data
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }

    if let Some(nodata) = read_nodata(&mut decoder) {
        raster.data_mut().mapv_inplace(|v| {
            if (v - nodata).abs() < f64::EPSILON * 100.0 {
                f64::NAN
            } else {
                v
            }
        });
    }
    raster.set_nodata(Some(f64::NAN));

    Ok(raster)
}

/// GeoTransform from ModelPixelScaleTag + ModelTiepointTag
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(GDAL_NODATA).ok()?;
    let value: f64 = text.trim_end_matches('\0').trim().parse().ok()?;
    (!value.is_nan()).then_some(value)
}

/// Write a band to a GeoTIFF file as 32-bit float, `NaN` for masked cells
pub fn write_band<P: AsRef<Path>>(raster: &Raster<f64>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    encode_band(raster, file)
}

/// Write a band to an in-memory GeoTIFF buffer
pub fn write_band_to_buffer(raster: &Raster<f64>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_band(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_band<W: Write + Seek>(raster: &Raster<f64>, writer: W) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;

    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster.data().iter().map(|&v| v as f32).collect();

    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image.encoder().write_tag(MODEL_PIXEL_SCALE, &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image.encoder().write_tag(MODEL_TIEPOINT, &tiepoint[..])?;

    // Minimal key directory: projected model, pixel-is-area
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image.encoder().write_tag(GEO_KEY_DIRECTORY, &geokeys[..])?;

    image.encoder().write_tag(GDAL_NODATA, "nan")?;

    image.write_data(&data)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_buffer_keeps_transform_and_mask() {
        let mut raster = Raster::filled(3, 4, 0.25_f64)
            .with_transform(GeoTransform::new(500_000.0, 4_900_000.0, 20.0, -20.0));
        raster.set(1, 2, f64::NAN).unwrap();

        let bytes = write_band_to_buffer(&raster).unwrap();
        let back = read_band_from_buffer(&bytes).unwrap();

        assert_eq!(back.shape(), (3, 4));
        assert!(back.same_grid(&raster));
        assert!(back.get(1, 2).unwrap().is_nan());
        assert!((back.get(0, 0).unwrap() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_band_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b8.tif");
        let raster = Raster::filled(2, 2, 3000.0_f64);
        write_band(&raster, &path).unwrap();
        assert_eq!(read_band(&path).unwrap().valid_count(), 4);
    }
}
