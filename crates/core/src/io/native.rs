//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Multi-band input is read either from one IFD with
//! interleaved samples (the layout GDAL/rasterio write for stacked Landsat
//! products) or from one IFD per band.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::metadata::parse_band_descriptions;
use crate::raster::{BandStack, GeoTransform, Raster};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{Gray32Float, Gray8};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_METADATA: u16 = 42112;
const TAG_GDAL_NODATA: u16 = 42113;

const GEOKEY_GEOGRAPHIC_TYPE: u32 = 2048;
const GEOKEY_PROJECTED_CS_TYPE: u32 = 3072;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Value written to the GDAL_NODATA tag, if any
    pub nodata: Option<f64>,
}

/// Read every band of a GeoTIFF into a [`BandStack`]
pub fn read_band_stack<P: AsRef<Path>>(path: P) -> Result<BandStack> {
    let file = File::open(path.as_ref())?;
    decode_stack(BufReader::new(file))
}

/// Read every band of an in-memory GeoTIFF into a [`BandStack`]
pub fn read_band_stack_from_buffer(data: &[u8]) -> Result<BandStack> {
    decode_stack(Cursor::new(data))
}

fn decode_stack<R: Read + Seek>(reader: R) -> Result<BandStack> {
    let mut decoder = Decoder::new(reader)
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?
        .with_limits(Limits::unlimited());

    // Georeferencing and descriptions live on the first IFD
    let transform = read_geotransform(&mut decoder).unwrap_or_default();
    let crs = read_crs(&mut decoder);
    let nodata = read_nodata(&mut decoder);
    let described = decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_METADATA))
        .map(|xml| parse_band_descriptions(&xml))
        .unwrap_or_default();

    let mut stack = BandStack::new();
    let mut band_index = 0usize;

    loop {
        let (width, height) = decoder
            .dimensions()
            .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
        let rows = height as usize;
        let cols = width as usize;
        let samples = decoder
            .get_tag_u32(Tag::SamplesPerPixel)
            .unwrap_or(1)
            .max(1) as usize;
        let page_description = decoder.get_tag_ascii_string(Tag::ImageDescription).ok();

        let values = decode_values(&mut decoder)?;
        if values.len() != rows * cols * samples {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        for sample in 0..samples {
            let data: Vec<f64> = values
                .iter()
                .skip(sample)
                .step_by(samples)
                .copied()
                .collect();
            let mut raster = Raster::from_vec(data, rows, cols)?;
            raster.set_transform(transform);
            raster.set_crs(crs.clone());
            raster.set_nodata(nodata);

            let description = described
                .iter()
                .find(|(s, _)| *s == band_index)
                .map(|(_, d)| d.clone())
                .or_else(|| {
                    if samples == 1 {
                        page_description.clone()
                    } else {
                        None
                    }
                })
                .unwrap_or_else(|| format!("Band {}", band_index + 1));

            stack.push(description, raster)?;
            band_index += 1;
        }

        if !decoder.more_images() {
            break;
        }
        decoder
            .next_image()
            .map_err(|e| Error::Other(format!("Cannot advance to next IFD: {}", e)))?;
    }

    Ok(stack)
}

fn decode_values<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f64>> {
    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let values = match result {
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };
    Ok(values)
}

/// Read the affine transform from ModelTransformation or tiepoint + scale tags
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TRANSFORMATION)) {
        if m.len() >= 8 {
            return Ok(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
        }
    }

    let scale = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE))
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT))
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// Read an EPSG code from the GeoKey directory, if one is stored inline
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder
        .get_tag_u32_vec(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY))
        .ok()?;
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;

    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4).take(count) {
        let (id, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 {
            continue;
        }
        match id {
            GEOKEY_PROJECTED_CS_TYPE => return Some(CRS::from_epsg(value)),
            GEOKEY_GEOGRAPHIC_TYPE => geographic = Some(CRS::from_epsg(value)),
            _ => {}
        }
    }
    geographic
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse::<f64>().ok())
}

/// Write GeoTIFF georeferencing tags on the current image directory
macro_rules! write_geo_tags {
    ($image:expr, $raster:expr, $options:expr) => {{
        let gt = $raster.transform();

        let scale = vec![gt.pixel_width, gt.pixel_height.abs(), 0.0];
        $image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE), scale.as_slice())
            .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

        let tiepoint = vec![0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        $image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT), tiepoint.as_slice())
            .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

        let geokeys = geokey_directory($raster.crs());
        $image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY), geokeys.as_slice())
            .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

        if let Some(nd) = $options.nodata {
            let text = if nd.is_nan() { "nan".to_string() } else { nd.to_string() };
            $image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA), text.as_str())
                .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;
        }
    }};
}

/// GeoKey directory: model type, raster type and, when known, the EPSG code
fn geokey_directory(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs.and_then(|c| c.epsg()).and_then(|e| u16::try_from(e).ok());
    let mut keys: Vec<u16> = vec![1, 1, 0, 2];
    // GTModelTypeGeoKey: 1 = projected, 2 = geographic
    let model_type = match epsg {
        Some(code) if (4000..5000).contains(&code) => 2,
        _ => 1,
    };
    keys.extend_from_slice(&[1024, 0, 1, model_type]);
    // GTRasterTypeGeoKey = RasterPixelIsArea
    keys.extend_from_slice(&[1025, 0, 1, 1]);
    if let Some(code) = epsg {
        let key = if model_type == 2 { 2048 } else { 3072 };
        keys.extend_from_slice(&[key, 0, 1, code]);
        keys[3] = 3;
    }
    keys
}

/// Write a float raster (residuals, LST) as a single-band 32-bit GeoTIFF
pub fn write_geotiff<P: AsRef<Path>>(
    raster: &Raster<f64>,
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    encode_f32(raster, file, &options.unwrap_or_default())
}

/// Write a float raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer(
    raster: &Raster<f64>,
    options: Option<GeoTiffOptions>,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_f32(raster, Cursor::new(&mut buf), &options.unwrap_or_default())?;
    Ok(buf)
}

/// Write a classification raster as a single-band 8-bit GeoTIFF
pub fn write_classification<P: AsRef<Path>>(raster: &Raster<u8>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    encode_u8(raster, file)
}

fn encode_f32<W: Write + Seek>(raster: &Raster<f64>, writer: W, options: &GeoTiffOptions) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster.data().iter().map(|&v| v as f32).collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    write_geo_tags!(image, raster, options);

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

fn encode_u8<W: Write + Seek>(raster: &Raster<u8>, writer: W) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();
    let data: Vec<u8> = raster.data().iter().copied().collect();
    let options = GeoTiffOptions::default();

    let mut image = encoder
        .new_image::<Gray8>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    write_geo_tags!(image, raster, options);

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_raster() -> Raster<f64> {
        let mut r = Raster::new(6, 5);
        r.set_transform(GeoTransform::new(500_000.0, 8_000_000.0, 30.0, -30.0));
        r.set_crs(Some(CRS::from_epsg(32622)));
        for row in 0..6 {
            for col in 0..5 {
                r.set(row, col, (row * 5 + col) as f64 * 0.5).unwrap();
            }
        }
        r
    }

    #[test]
    fn test_buffer_roundtrip() {
        let raster = make_raster();
        let buf = write_geotiff_to_buffer(&raster, None).unwrap();
        let stack = read_band_stack_from_buffer(&buf).unwrap();

        assert_eq!(stack.len(), 1);
        assert_eq!(stack.descriptions(), vec!["Band 1"]);
        let band = stack.by_description("Band 1").unwrap();
        assert_eq!(band.shape(), (6, 5));
        assert!((band.get(3, 2).unwrap() - 8.5).abs() < 1e-6);
        assert!((band.transform().origin_x - 500_000.0).abs() < 1e-6);
        assert!((band.transform().pixel_height + 30.0).abs() < 1e-9);
        assert_eq!(band.crs().and_then(|c| c.epsg()), Some(32622));
    }

    #[test]
    fn test_nodata_tag_roundtrip() {
        let raster = make_raster();
        let options = GeoTiffOptions { nodata: Some(-9999.0) };
        let buf = write_geotiff_to_buffer(&raster, Some(options)).unwrap();
        let stack = read_band_stack_from_buffer(&buf).unwrap();
        assert_eq!(stack.by_description("Band 1").unwrap().nodata(), Some(-9999.0));
    }

    #[test]
    fn test_classification_file_roundtrip() {
        let base = make_raster();
        let codes = base.map(|v| (v as u8) % 5);

        let tmp = tempfile::NamedTempFile::with_suffix(".tif").unwrap();
        write_classification(&codes, tmp.path()).unwrap();

        let stack = read_band_stack(tmp.path()).unwrap();
        let band = stack.by_description("Band 1").unwrap();
        for row in 0..6 {
            for col in 0..5 {
                assert_eq!(
                    band.get(row, col).unwrap(),
                    codes.get(row, col).unwrap() as f64,
                    "pixel ({row},{col})"
                );
            }
        }
    }

    #[test]
    fn test_geokeys_include_epsg() {
        let keys = geokey_directory(Some(&CRS::from_epsg(32622)));
        assert_eq!(keys[3], 3);
        assert_eq!(&keys[12..16], &[3072, 0, 1, 32622]);

        let keys = geokey_directory(None);
        assert_eq!(keys[3], 2);
        assert_eq!(keys.len(), 12);
    }
}
