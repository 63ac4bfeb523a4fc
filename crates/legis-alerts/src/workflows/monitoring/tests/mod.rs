mod common;

mod matching;
