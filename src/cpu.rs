// Copyright 2020 Yevhenii Reizner
//
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! CPU feature detection used by the blit and fill dispatchers.
//!
//! Features are detected once, on first use, and cached for the process lifetime.
//! The `SOFTBLIT_CPU_FEATURES` environment variable forces a specific bitmask
//! (decimal or `0x` prefixed hex), bypassing detection entirely. `0` forces scalar code.

use once_cell::sync::OnceCell;

/// Name of the environment variable that overrides CPU feature detection.
pub const CPU_FEATURES_ENV: &str = "SOFTBLIT_CPU_FEATURES";

bitflags::bitflags! {
    /// A set of CPU vector instruction sets.
    ///
    /// An empty set means "any CPU".
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
    pub struct CpuFeatures: u32 {
        /// 64-bit integer vectors.
        const MMX = 0x01;
        /// AMD 3DNow!
        const THREE_D_NOW = 0x02;
        /// 128-bit float vectors.
        const SSE = 0x04;
        /// 128-bit integer vectors.
        const SSE2 = 0x08;
        /// AltiVec, with data stream prefetch.
        const ALTIVEC_PREFETCH = 0x10;
        /// AltiVec, without data stream prefetch.
        const ALTIVEC_NOPREFETCH = 0x20;
    }
}

static FEATURES: OnceCell<CpuFeatures> = OnceCell::new();

/// Returns the cached CPU feature set, detecting it on the first call.
///
/// Concurrent first calls may detect twice, but always store the same value.
pub fn cpu_features() -> CpuFeatures {
    *FEATURES.get_or_init(|| {
        let features = match std::env::var(CPU_FEATURES_ENV) {
            Ok(value) => match parse_override(&value) {
                Some(features) => {
                    log::debug!("CPU features forced by {}: {:?}", CPU_FEATURES_ENV, features);
                    features
                }
                None => {
                    log::warn!("ignoring malformed {} value: {:?}", CPU_FEATURES_ENV, value);
                    detect()
                }
            },
            Err(_) => detect(),
        };

        log::debug!("CPU features: {:?}", features);
        features
    })
}

/// Checks that the current CPU has MMX.
pub fn has_mmx() -> bool {
    cpu_features().contains(CpuFeatures::MMX)
}

/// Checks that the current CPU has 3DNow!
pub fn has_3dnow() -> bool {
    cpu_features().contains(CpuFeatures::THREE_D_NOW)
}

/// Checks that the current CPU has SSE.
pub fn has_sse() -> bool {
    cpu_features().contains(CpuFeatures::SSE)
}

/// Checks that the current CPU has SSE2.
pub fn has_sse2() -> bool {
    cpu_features().contains(CpuFeatures::SSE2)
}

/// Checks that the current CPU has AltiVec.
pub fn has_altivec() -> bool {
    cpu_features().intersects(CpuFeatures::ALTIVEC_PREFETCH | CpuFeatures::ALTIVEC_NOPREFETCH)
}

/// Checks that a routine requiring `required` can run on the current CPU.
#[inline]
pub(crate) fn supports(required: CpuFeatures) -> bool {
    required.is_empty() || cpu_features().contains(required)
}

fn parse_override(value: &str) -> Option<CpuFeatures> {
    let value = value.trim();
    let bits = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        value.parse::<u32>().ok()?
    };

    // Unknown bits are kept, so any explicit value is honored.
    Some(CpuFeatures::from_bits_retain(bits))
}

fn detect() -> CpuFeatures {
    #[allow(unused_mut)]
    let mut features = CpuFeatures::empty();

    cfg_if::cfg_if! {
        if #[cfg(all(feature = "simd", any(target_arch = "x86", target_arch = "x86_64")))] {
            if std::is_x86_feature_detected!("mmx") {
                features |= CpuFeatures::MMX;
            }
            if std::is_x86_feature_detected!("sse") {
                features |= CpuFeatures::SSE;
            }
            if std::is_x86_feature_detected!("sse2") {
                features |= CpuFeatures::SSE2;
            }
            // 3DNow! cannot be queried through std and is absent on current CPUs.
        } else if #[cfg(all(feature = "simd", target_feature = "altivec"))] {
            // No portable way to query the cache size, so assume a G4 with prefetch.
            features |= CpuFeatures::ALTIVEC_PREFETCH;
        }
    }

    features
}
