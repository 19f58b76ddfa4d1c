// ledgercheck CLI internals shared by the binary and its tests

pub mod controller;
pub mod terminal;
