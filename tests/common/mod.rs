//! Synthetic Kepler KOI tables for integration tests

#![allow(dead_code)]

use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

pub const FEATURES: [&str; 5] = ["koi_period", "koi_depth", "koi_prad", "koi_teq", "koi_fpflag_nt"];

/// Label of row `i`: every fifth row is a false positive, the rest alternate
pub fn label_for(i: usize) -> &'static str {
    if i % 5 == 4 {
        "FALSE POSITIVE"
    } else if i % 2 == 0 {
        "CONFIRMED"
    } else {
        "CANDIDATE"
    }
}

/// A labeled table with every schema column. Features separate CONFIRMED from
/// the rest; `koi_depth` and `koi_tce_delivname` have gaps.
pub fn koi_table(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut period = Vec::with_capacity(n);
    let mut depth = Vec::with_capacity(n);
    let mut prad = Vec::with_capacity(n);
    let mut teq = Vec::with_capacity(n);
    let mut fpflag = Vec::with_capacity(n);
    for i in 0..n {
        let confirmed = label_for(i) == "CONFIRMED";
        if confirmed {
            period.push(rng.gen_range(1.0..20.0));
            depth.push(rng.gen_range(100.0..500.0));
            prad.push(rng.gen_range(1.0..3.0));
            teq.push(rng.gen_range(300_i64..800));
        } else {
            period.push(rng.gen_range(30.0..100.0));
            depth.push(rng.gen_range(1000.0..5000.0));
            prad.push(rng.gen_range(8.0..15.0));
            teq.push(rng.gen_range(1000_i64..2000));
        }
        fpflag.push(rng.gen_range(0_i64..2));
    }
    let depth: Vec<Option<f64>> = depth
        .into_iter()
        .enumerate()
        .map(|(i, d)| if i % 7 == 3 { None } else { Some(d) })
        .collect();

    let rowid: Vec<i64> = (1..=n as i64).collect();
    let kepid: Vec<i64> = (0..n as i64).map(|i| 10_000_000 + i).collect();
    let kepoi_name: Vec<String> = (0..n).map(|i| format!("K{:05}.01", i + 1)).collect();
    let kepler_name: Vec<Option<String>> = (0..n)
        .map(|i| (label_for(i) == "CONFIRMED").then(|| format!("Kepler-{} b", i + 1)))
        .collect();
    let pdisposition: Vec<&str> = (0..n)
        .map(|i| if label_for(i) == "FALSE POSITIVE" { "FALSE POSITIVE" } else { "CANDIDATE" })
        .collect();
    let score: Vec<f64> = (0..n).map(|i| (i % 10) as f64 / 10.0).collect();
    let delivname: Vec<Option<&str>> = (0..n)
        .map(|i| match i % 6 {
            5 => None,
            4 => Some("q1_q16_tce"),
            _ => Some("q1_q17_dr25_tce"),
        })
        .collect();
    let teq_err1: Vec<Option<f64>> = (0..n).map(|i| (i % 3 != 0).then_some(35.0)).collect();
    let teq_err2: Vec<Option<f64>> = (0..n).map(|i| (i % 3 != 0).then_some(-35.0)).collect();
    let labels: Vec<&str> = (0..n).map(label_for).collect();

    df!(
        "loc_rowid" => rowid,
        "kepid" => kepid,
        "kepoi_name" => kepoi_name,
        "kepler_name" => kepler_name,
        "koi_disposition" => labels,
        "koi_pdisposition" => pdisposition,
        "koi_score" => score,
        "koi_period" => period,
        "koi_depth" => depth,
        "koi_prad" => prad,
        "koi_teq" => teq,
        "koi_teq_err1" => teq_err1,
        "koi_teq_err2" => teq_err2,
        "koi_fpflag_nt" => fpflag,
        "koi_tce_delivname" => delivname
    )
    .unwrap()
}

/// Same layout without the label column
pub fn unlabeled_koi_table(n: usize, seed: u64) -> DataFrame {
    koi_table(n, seed).drop("koi_disposition").unwrap()
}

pub fn false_positive_count(n: usize) -> usize {
    (0..n).filter(|i| label_for(*i) == "FALSE POSITIVE").count()
}

pub fn to_csv_bytes(df: &DataFrame) -> Vec<u8> {
    let mut df = df.clone();
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf).include_header(true).finish(&mut df).unwrap();
    buf
}
