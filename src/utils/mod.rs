//! Shared helpers: file reading, token estimation, path handling.

pub mod classify;
pub mod encoding;
pub mod hashing;
pub mod paths;
pub mod tokens;

pub use classify::is_noise_path;
pub use encoding::{looks_binary, read_text_file, Unreadable};
pub use hashing::fragment_id;
pub use paths::{normalize_path, parent_dir};
pub use tokens::{estimate_tokens, truncate_to_tokens, HeuristicTokenCounter, TokenCounter};
