pub mod dispatcher;
pub mod envelope;
pub mod operation;
pub mod resolver;
pub mod server;

pub use dispatcher::{Dispatcher, GatewayResponse};
pub use envelope::{GatewayBody, GatewayError, ResponseData, ResponseEnvelope};
pub use operation::{ChatArgs, OperationRequest};
pub use resolver::{Resolver, ResolverContext};
pub use server::{build_router, serve};
