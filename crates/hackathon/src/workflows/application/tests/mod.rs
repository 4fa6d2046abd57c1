mod common;
mod normalize;
