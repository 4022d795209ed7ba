#![allow(missing_docs)]

mod sponsorship;

const fn main() {}
