pub mod preview;

pub use preview::preview_compact;
