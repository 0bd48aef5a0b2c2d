use serde::{Deserialize, Serialize};
use warpview_image::Image;

/// Interpolation mode for continuous content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationMode {
    /// Nearest neighbor interpolation
    #[default]
    Nearest,
    /// Bilinear interpolation
    Bilinear,
}

/// Kernel for interpolating a pixel value
///
/// # Arguments
///
/// * `image` - The input image container with shape (height, width, C).
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// # Returns
///
/// The interpolated pixel value, or zeros when `(u, v)` lies more than half a pixel outside
/// the image.
pub fn interpolate_pixel<const C: usize>(
    image: &Image<f32, C>,
    u: f64,
    v: f64,
    interpolation: InterpolationMode,
) -> [f32; C] {
    let (cols, rows) = (image.cols() as f64, image.rows() as f64);
    let inside = u >= -0.5 && u < cols - 0.5 && v >= -0.5 && v < rows - 0.5;
    if !inside {
        return [0.0; C];
    }
    match interpolation {
        InterpolationMode::Bilinear => bilinear_interpolation(image, u, v),
        InterpolationMode::Nearest => nearest_neighbor_interpolation(image, u, v),
    }
}

fn texel<const C: usize>(image: &Image<f32, C>, x: usize, y: usize) -> &[f32] {
    let base = (y * image.cols() + x) * C;
    &image.as_slice()[base..base + C]
}

// border pixels are replicated
fn bilinear_interpolation<const C: usize>(image: &Image<f32, C>, u: f64, v: f64) -> [f32; C] {
    let (cols, rows) = (image.cols(), image.rows());

    let u = u.clamp(0.0, (cols - 1) as f64);
    let v = v.clamp(0.0, (rows - 1) as f64);

    let iu0 = u.floor() as usize;
    let iv0 = v.floor() as usize;
    let iu1 = (iu0 + 1).min(cols - 1);
    let iv1 = (iv0 + 1).min(rows - 1);

    let frac_u = (u - iu0 as f64) as f32;
    let frac_v = (v - iv0 as f64) as f32;
    let frac_uu = 1.0 - frac_u;
    let frac_vv = 1.0 - frac_v;

    let w00 = frac_uu * frac_vv;
    let w01 = frac_u * frac_vv;
    let w10 = frac_uu * frac_v;
    let w11 = frac_u * frac_v;

    let p00 = texel(image, iu0, iv0);
    let p01 = texel(image, iu1, iv0);
    let p10 = texel(image, iu0, iv1);
    let p11 = texel(image, iu1, iv1);

    let mut pixel = [0.0; C];
    for k in 0..C {
        pixel[k] = p00[k] * w00 + p01[k] * w01 + p10[k] * w10 + p11[k] * w11;
    }
    pixel
}

fn nearest_neighbor_interpolation<const C: usize>(
    image: &Image<f32, C>,
    u: f64,
    v: f64,
) -> [f32; C] {
    let iu = (u.round().max(0.0) as usize).min(image.cols() - 1);
    let iv = (v.round().max(0.0) as usize).min(image.rows() - 1);

    let mut pixel = [0.0; C];
    pixel.copy_from_slice(texel(image, iu, iv));
    pixel
}

#[cfg(test)]
mod tests {
    use super::{interpolate_pixel, InterpolationMode};
    use approx::assert_relative_eq;
    use warpview_image::{Image, ImageError, ImageSize};

    fn ramp() -> Result<Image<f32, 1>, ImageError> {
        Image::new(ImageSize { width: 2, height: 2 }, vec![0.0, 1.0, 2.0, 3.0])
    }

    #[test]
    fn bilinear_center() -> Result<(), ImageError> {
        let image = ramp()?;
        let [v] = interpolate_pixel(&image, 0.5, 0.5, InterpolationMode::Bilinear);
        assert_relative_eq!(v, 1.5);
        let [v] = interpolate_pixel(&image, 1.0, 0.25, InterpolationMode::Bilinear);
        assert_relative_eq!(v, 1.5);
        Ok(())
    }

    #[test]
    fn nearest_rounds() -> Result<(), ImageError> {
        let image = ramp()?;
        assert_eq!(interpolate_pixel(&image, 0.6, 0.2, InterpolationMode::Nearest), [1.0]);
        assert_eq!(interpolate_pixel(&image, 1.4, 1.4, InterpolationMode::Nearest), [3.0]);
        Ok(())
    }

    #[test]
    fn outside_is_zero() -> Result<(), ImageError> {
        let image = ramp()?;
        assert_eq!(interpolate_pixel(&image, -0.6, 0.0, InterpolationMode::Nearest), [0.0]);
        assert_eq!(interpolate_pixel(&image, 0.0, 1.5, InterpolationMode::Bilinear), [0.0]);
        assert_eq!(interpolate_pixel(&image, f64::NAN, 0.0, InterpolationMode::Bilinear), [0.0]);
        Ok(())
    }
}
