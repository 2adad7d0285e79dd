/// Integrity capabilities of a single stack, fixed at construction time.
///
/// Each switch is independent. With everything disabled the stack degrades
/// to a bounds-checked dynamic array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackConfig {
    diagnostics: bool,
    guard_markers: bool,
    checksums: bool,
    strict_memory: bool,
}

impl Default for StackConfig {
    /// Guard markers and checksums on; diagnostics follow the build profile.
    fn default() -> Self {
        StackConfig {
            diagnostics: cfg!(debug_assertions),
            guard_markers: true,
            checksums: true,
            strict_memory: false,
        }
    }
}

impl StackConfig {
    /// No diagnostics, no guard markers, no checksums.
    pub fn bare() -> StackConfig {
        StackConfig {
            diagnostics: false,
            guard_markers: false,
            checksums: false,
            strict_memory: false,
        }
    }

    /// All integrity layers and diagnostics enabled.
    pub fn paranoid() -> StackConfig {
        StackConfig {
            diagnostics: true,
            guard_markers: true,
            checksums: true,
            strict_memory: false,
        }
    }

    /// Identity tracking, dumps and automatic dumps on failures.
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Sentinels around the stack record and its buffer.
    pub fn with_guard_markers(mut self, enabled: bool) -> Self {
        self.guard_markers = enabled;
        self
    }

    /// Structural and content checksums.
    pub fn with_checksums(mut self, enabled: bool) -> Self {
        self.checksums = enabled;
        self
    }

    /// Makes the excess memory usage heuristic a hard error instead of a
    /// logged advisory.
    pub fn with_strict_memory(mut self, enabled: bool) -> Self {
        self.strict_memory = enabled;
        self
    }

    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }

    pub fn guard_markers(&self) -> bool {
        self.guard_markers
    }

    pub fn checksums(&self) -> bool {
        self.checksums
    }

    pub fn strict_memory(&self) -> bool {
        self.strict_memory
    }

    /// Packs the switches into a word covered by the structural checksum.
    pub(crate) fn bits(&self) -> u64 {
        (self.diagnostics as u64)
            | (self.guard_markers as u64) << 1
            | (self.checksums as u64) << 2
            | (self.strict_memory as u64) << 3
    }
}
