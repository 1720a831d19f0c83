/// Default cap on the bytes a decoder may hold while waiting for a frame to complete.
pub const DEFAULT_MAX_BUFFER_LEN: usize = 512 * 1024 * 1024;

/// Default cap on a declared bulk string length, matches Redis `proto-max-bulk-len`.
pub const DEFAULT_MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Default cap on a declared array element count.
pub const DEFAULT_MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Default cap on array nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Hard ceiling on array nesting. Frames are parsed recursively, one stack frame per level.
pub const MAX_DEPTH_CEILING: usize = 1024;

/// Default cap on an unterminated inline command line, matches the Redis inline request limit.
pub const DEFAULT_MAX_INLINE_LEN: usize = 64 * 1024;

/// Default cap on an unterminated `+`, `-` or `:` line, or a `$`/`*` header.
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

/// Bounds enforced while decoding. Declared lengths are checked against these before any
/// allocation happens, so a peer cannot make the decoder reserve memory it never sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_buffer_len: usize,
    pub max_bulk_len: usize,
    pub max_array_len: usize,
    pub max_depth: usize,
    pub max_inline_len: usize,
    pub max_line_len: usize,
}

impl Limits {
    pub const fn new() -> Self {
        Self {
            max_buffer_len: DEFAULT_MAX_BUFFER_LEN,
            max_bulk_len: DEFAULT_MAX_BULK_LEN,
            max_array_len: DEFAULT_MAX_ARRAY_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
            max_inline_len: DEFAULT_MAX_INLINE_LEN,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }

    pub const fn max_buffer_len(mut self, len: usize) -> Self {
        self.max_buffer_len = len;
        self
    }

    pub const fn max_bulk_len(mut self, len: usize) -> Self {
        self.max_bulk_len = len;
        self
    }

    pub const fn max_array_len(mut self, len: usize) -> Self {
        self.max_array_len = len;
        self
    }

    /// Values above [`MAX_DEPTH_CEILING`] are clamped to it.
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = if depth > MAX_DEPTH_CEILING {
            MAX_DEPTH_CEILING
        } else {
            depth
        };
        self
    }

    pub const fn max_inline_len(mut self, len: usize) -> Self {
        self.max_inline_len = len;
        self
    }

    pub const fn max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new()
    }
}
