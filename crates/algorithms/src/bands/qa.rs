//! QA_PIXEL quality masking

use serde::{Deserialize, Serialize};
use thermanom_core::{Mask, Raster};

const BIT_FILL: u64 = 1 << 0;
const BIT_DILATED_CLOUD: u64 = 1 << 1;
const BIT_CLOUD: u64 = 1 << 3;
const BIT_CLOUD_SHADOW: u64 = 1 << 4;

/// Which QA_PIXEL flags invalidate a pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaParams {
    pub mask_fill: bool,
    pub mask_dilated_cloud: bool,
    pub mask_cloud: bool,
    pub mask_cloud_shadow: bool,
    /// A QA word of 0 carries no clear-sky bits and marks unprocessed pixels
    pub mask_zero: bool,
}

impl Default for QaParams {
    fn default() -> Self {
        Self {
            mask_fill: true,
            mask_dilated_cloud: true,
            mask_cloud: true,
            mask_cloud_shadow: true,
            mask_zero: true,
        }
    }
}

impl QaParams {
    /// Bit pattern of the enabled flags
    pub fn rejection_bits(&self) -> u64 {
        let mut bits = 0;
        if self.mask_fill {
            bits |= BIT_FILL;
        }
        if self.mask_dilated_cloud {
            bits |= BIT_DILATED_CLOUD;
        }
        if self.mask_cloud {
            bits |= BIT_CLOUD;
        }
        if self.mask_cloud_shadow {
            bits |= BIT_CLOUD_SHADOW;
        }
        bits
    }
}

/// True where the QA word carries none of the enabled rejection flags.
///
/// Non-finite or negative QA values are treated as fill, and so is 0 when
/// `mask_zero` is set.
pub fn qa_valid_mask(qa: &Raster<f64>, params: &QaParams) -> Mask {
    let bits = params.rejection_bits();
    Mask::from_array(qa.data().mapv(|v| {
        if !v.is_finite() || v < 0.0 {
            return false;
        }
        let word = v.round() as u64;
        if word == 0 && params.mask_zero {
            return false;
        }
        word & bits == 0
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_pixels_pass() {
        // 21824: clear land, low confidence flags only
        let qa = Raster::from_vec(vec![21824.0, 64.0, 21952.0, 1.0], 2, 2).unwrap();
        let mask = qa_valid_mask(&qa, &QaParams::default());
        assert!(mask.get(0, 0));
        assert!(mask.get(0, 1));
        assert!(mask.get(1, 0));
        assert!(!mask.get(1, 1), "fill bit must invalidate");
    }

    #[test]
    fn test_zero_and_fill_words_rejected() {
        let qa = Raster::from_vec(vec![0.0, 1.0], 1, 2).unwrap();
        let mask = qa_valid_mask(&qa, &QaParams::default());
        assert_eq!(mask.count(), 0);

        let params = QaParams {
            mask_zero: false,
            ..QaParams::default()
        };
        let mask = qa_valid_mask(&qa, &params);
        assert!(mask.get(0, 0));
        assert!(!mask.get(0, 1));
    }

    #[test]
    fn test_cloud_and_shadow_rejected() {
        let qa = Raster::from_vec(vec![8.0, 16.0, 2.0, f64::NAN], 2, 2).unwrap();
        let mask = qa_valid_mask(&qa, &QaParams::default());
        assert_eq!(mask.count(), 0);
    }

    #[test]
    fn test_flags_can_be_disabled() {
        let qa = Raster::from_vec(vec![8.0, 16.0], 1, 2).unwrap();
        let params = QaParams {
            mask_cloud: false,
            ..QaParams::default()
        };
        let mask = qa_valid_mask(&qa, &params);
        assert!(mask.get(0, 0));
        assert!(!mask.get(0, 1));
    }
}
