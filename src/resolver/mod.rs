//! Resolver role: zipcode → city → temperature.
//!
//! # Data Flow
//! ```text
//! POST / {"cep": ".."}
//!     → handler.rs (extract trace context, open resolver.inbound, validate)
//!     → pipeline.rs (resolver.resolve_city, then resolver.fetch_weather)
//!     → providers.rs (ViaCEP, WeatherAPI)
//!     → convert.rs (°C → °F, K)
//!     → 200 {"city", "temp_C", "temp_F", "temp_K"}
//! ```

pub mod convert;
pub mod handler;
pub mod pipeline;
pub mod providers;

pub use convert::Temperatures;
pub use handler::{resolve_handler, ResolverState, INBOUND_SPAN};
pub use pipeline::{ResolverPipeline, Stage, StageError, WeatherResult};
pub use providers::{
    ProviderError, ViaCepProvider, WeatherApiProvider, WeatherProvider, ZipcodeProvider,
};
