//! End-to-end distribution flows.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod distribution_flow;

#[cfg(test)]
mod guards;
