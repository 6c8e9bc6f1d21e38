mod panic_hook;

pub use panic_hook::tracing_panic_hook;
