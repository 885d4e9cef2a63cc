pub mod oembed;
