mod signal;
mod spin;

pub(crate) use self::{signal::Signal, spin::SpinWait};
