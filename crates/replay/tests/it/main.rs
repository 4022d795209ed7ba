#![allow(missing_docs)]

mod chain;

const fn main() {}
