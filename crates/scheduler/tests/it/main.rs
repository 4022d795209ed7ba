#![allow(missing_docs)]

mod schedule;

const fn main() {}
