#[doc(inline)]
pub use gdx;
#[doc(inline)]
pub use inf;
