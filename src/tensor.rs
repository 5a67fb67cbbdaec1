// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Raw output tensors and shape contracts.
//!
//! Runtimes hand back a flat `f32` buffer plus a shape. [`RawTensor`] keeps the
//! two together and hands out typed `ndarray` views once the shape has been
//! checked against the contract of the stage that consumes it.

use ndarray::{ArrayView2, ArrayView3};

use crate::error::{DecodeError, Result};

/// A dense row-major `f32` tensor as produced by an inference runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTensor {
    /// Flat row-major values.
    pub data: Vec<f32>,
    /// Dimensions, outermost first.
    pub shape: Vec<usize>,
}

impl RawTensor {
    /// Wrap a buffer and its shape.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ShapeMismatch`] if the element count does not match the shape.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(DecodeError::ShapeMismatch {
                expected: format!("{expected} elements for shape {shape:?}"),
                got: format!("{} elements", data.len()),
            });
        }
        Ok(Self { data, shape })
    }

    /// View as `[C, H, W]`, accepting `[C, H, W]` or `[1, C, H, W]`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ShapeMismatch`] for any other rank or batch size.
    pub fn view_chw(&self) -> Result<ArrayView3<'_, f32>> {
        chw_view(&self.data, &self.shape)
    }

    /// View as `[N, cols]` rows, accepting any shape `[1, .., 1, N, cols]`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ShapeMismatch`] if the last dimension differs from
    /// `cols` or a leading dimension is not 1.
    pub fn view_rows(&self, cols: usize) -> Result<ArrayView2<'_, f32>> {
        rows_view(&self.data, &self.shape, cols)
    }
}

/// Borrow a flat buffer as `[C, H, W]` (a leading batch dimension of 1 is dropped).
///
/// # Errors
///
/// Returns [`DecodeError::ShapeMismatch`] if the shape is not `[C, H, W]` / `[1, C, H, W]`
/// or the buffer length disagrees with it.
pub fn chw_view<'a>(data: &'a [f32], shape: &[usize]) -> Result<ArrayView3<'a, f32>> {
    let dims = match shape {
        [c, h, w] | [1, c, h, w] => (*c, *h, *w),
        _ => return Err(DecodeError::shape("[C, H, W] or [1, C, H, W]", shape)),
    };
    ArrayView3::from_shape(dims, data).map_err(|_| DecodeError::ShapeMismatch {
        expected: format!("{} elements for shape {shape:?}", dims.0 * dims.1 * dims.2),
        got: format!("{} elements", data.len()),
    })
}

/// Borrow a flat buffer as `[N, cols]` rows.
///
/// # Errors
///
/// Returns [`DecodeError::ShapeMismatch`] if the shape does not end in `cols`, has a
/// leading dimension other than 1, or disagrees with the buffer length.
pub fn rows_view<'a>(data: &'a [f32], shape: &[usize], cols: usize) -> Result<ArrayView2<'a, f32>> {
    let expected = || format!("[N, {cols}] or [1, .., 1, N, {cols}]");
    let (rows, last) = match shape {
        [.., n, c] if *c == cols => (*n, *c),
        _ => return Err(DecodeError::shape(expected(), shape)),
    };
    if shape[..shape.len() - 2].iter().any(|&d| d != 1) {
        return Err(DecodeError::shape(expected(), shape));
    }
    ArrayView2::from_shape((rows, last), data).map_err(|_| DecodeError::ShapeMismatch {
        expected: format!("{} elements for shape {shape:?}", rows * last),
        got: format!("{} elements", data.len()),
    })
}
