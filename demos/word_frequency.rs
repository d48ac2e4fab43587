//! Counts the words of a text file and prints the most and least frequent.
//!
//! ```text
//! cargo run --example word_frequency -- <file> [limit]
//! ```

use std::env;
use std::process;

use avl_dict::frequency::{count_words_in_file, least_frequent, most_frequent, Selection};

fn main() {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: word_frequency <file> [limit]");
        process::exit(2);
    };
    let limit = match args.next().map(|arg| arg.parse::<usize>()) {
        None => 10,
        Some(Ok(limit)) => limit,
        Some(Err(err)) => {
            eprintln!("invalid limit: {err}");
            process::exit(2);
        }
    };

    let counts = match count_words_in_file(&path) {
        Ok(counts) => counts,
        Err(err) => {
            eprintln!("{path}: {err}");
            process::exit(1);
        }
    };
    println!("{} distinct words, tree height {}", counts.len(), counts.height());

    println!("\nmost frequent:");
    for cursor in most_frequent(&counts, limit, Selection::WithTies) {
        println!("{cursor}");
    }

    println!("\nleast frequent:");
    for cursor in least_frequent(&counts, limit, Selection::Exact) {
        println!("{cursor}");
    }
}
