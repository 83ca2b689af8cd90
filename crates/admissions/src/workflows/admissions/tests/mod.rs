mod common;
mod oversight;
mod routing;
