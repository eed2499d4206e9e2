mod source;

pub use source::AudioSourceRef;
