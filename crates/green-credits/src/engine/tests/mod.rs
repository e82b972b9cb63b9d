mod common;
mod redemptions;
mod routing;
