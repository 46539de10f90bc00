//! Padding block generation.

use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::range::QueryMode;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";
const LINE_SEPARATOR: &str = "\r\n";
const LINE_TAIL: &str = ":0";

/// Padding settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PaddingPolicy {
    /// Allow clients to opt into padding at all.
    pub enabled: bool,
    /// Minimum number of fabricated lines.
    pub min_lines: u32,
    /// Width of the random range added on top of `min_lines`.
    pub line_span: u32,
}

impl Default for PaddingPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            min_lines: 10,
            line_span: 200,
        }
    }
}

/// True when the `Add-Padding` header asks for padding (`true`, any case).
pub fn wants_padding(header: Option<&str>) -> bool {
    header.is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Something that can produce padding blocks off the async runtime.
pub trait PaddingSource: Send + Sync + 'static {
    /// True when the caller opted in and padding is allowed.
    fn is_requested(&self, add_padding: Option<&str>) -> bool;

    /// One complete padding block for `mode`.
    fn block(&self, mode: QueryMode) -> String;
}

/// Builds padding blocks for one policy.
#[derive(Debug, Clone, Copy)]
pub struct PaddingGenerator {
    policy: PaddingPolicy,
}

impl PaddingGenerator {
    pub fn new(policy: PaddingPolicy) -> Self {
        Self { policy }
    }

    /// True when padding is enabled and the caller opted in.
    pub fn is_requested(&self, add_padding: Option<&str>) -> bool {
        self.policy.enabled && wants_padding(add_padding)
    }

    /// Produce a padding block unconditionally, with the count drawn from the
    /// OS CSPRNG.
    pub fn block(&self, mode: QueryMode) -> String {
        self.generate_with(&mut OsRng, &mut fastrand::Rng::new(), mode)
    }

    /// Produce a padding block using explicit random sources.
    ///
    /// `count_rng` decides how many lines are emitted and must be a CSPRNG in
    /// production. `content_rng` only fills in hex digits.
    pub fn generate_with<C: RngCore>(
        &self,
        count_rng: &mut C,
        content_rng: &mut fastrand::Rng,
        mode: QueryMode,
    ) -> String {
        let count = self.line_count(count_rng.next_u32());
        let hex_len = mode.suffix_len();
        let line_len = LINE_SEPARATOR.len() + hex_len + LINE_TAIL.len();

        let mut block = String::with_capacity(count.saturating_mul(line_len));
        for _ in 0..count {
            block.push_str(LINE_SEPARATOR);
            for _ in 0..hex_len {
                block.push(HEX_DIGITS[content_rng.usize(..HEX_DIGITS.len())] as char);
            }
            block.push_str(LINE_TAIL);
        }
        block
    }

    /// `min_lines + floor(line_span * r)` with `r = draw / 2^32` in [0, 1).
    fn line_count(&self, draw: u32) -> usize {
        let scaled = (u64::from(self.policy.line_span) * u64::from(draw)) >> 32;
        self.policy.min_lines as usize + scaled as usize
    }
}

impl PaddingSource for PaddingGenerator {
    fn is_requested(&self, add_padding: Option<&str>) -> bool {
        PaddingGenerator::is_requested(self, add_padding)
    }

    fn block(&self, mode: QueryMode) -> String {
        PaddingGenerator::block(self, mode)
    }
}
