mod common;
mod expired;
mod routing;
