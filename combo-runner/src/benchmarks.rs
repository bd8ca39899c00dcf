//! Reference CPU benchmark table and fuzzy lookup.
//!
//! Scores are PassMark-style approximations, good enough to rank combos
//! against each other. They are not meant to be exact.

use serde::Serialize;

/// Benchmark scores for one CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CpuBenchmark {
    pub cpu_name: &'static str,
    pub cores: u32,
    pub threads: u32,
    pub single_core_score: u32,
    pub multi_core_score: u32,
}

impl CpuBenchmark {
    /// "16C/32T"
    pub fn core_label(&self) -> String {
        format!("{}C/{}T", self.cores, self.threads)
    }
}

const fn cpu(name: &'static str, cores: u32, threads: u32, sc: u32, mc: u32) -> CpuBenchmark {
    CpuBenchmark {
        cpu_name: name,
        cores,
        threads,
        single_core_score: sc,
        multi_core_score: mc,
    }
}

pub const CPU_BENCHMARKS: &[CpuBenchmark] = &[
    // AMD Ryzen 9000 (AM5)
    cpu("Ryzen 9 9950X", 16, 32, 4600, 65000),
    cpu("Ryzen 9 9900X", 12, 24, 4500, 52000),
    cpu("Ryzen 7 9850X3D", 8, 16, 4700, 37000),
    cpu("Ryzen 7 9850X", 8, 16, 4500, 34000),
    cpu("Ryzen 7 9800X3D", 8, 16, 4700, 36000),
    cpu("Ryzen 7 9700X", 8, 16, 4200, 32000),
    cpu("Ryzen 5 9600X", 6, 12, 4100, 25000),
    cpu("Ryzen 5 9600", 6, 12, 3900, 23000),
    // AMD Ryzen 7000 (AM5)
    cpu("Ryzen 9 7950X", 16, 32, 4300, 63000),
    cpu("Ryzen 9 7900X", 12, 24, 4200, 50000),
    cpu("Ryzen 7 7800X3D", 8, 16, 4400, 33000),
    cpu("Ryzen 7 7700X", 8, 16, 4000, 30000),
    cpu("Ryzen 5 7600X", 6, 12, 3900, 23000),
    cpu("Ryzen 5 7600", 6, 12, 3700, 22000),
    // Intel Arrow Lake (LGA 1851)
    cpu("Core Ultra 9 285K", 24, 24, 4700, 55000),
    cpu("Core Ultra 7 265K", 20, 20, 4500, 45000),
    cpu("Core Ultra 7 265KF", 20, 20, 4500, 45000),
    cpu("Core Ultra 5 245K", 14, 14, 4300, 33000),
    cpu("Core Ultra 5 245KF", 14, 14, 4300, 33000),
    // Intel 14th gen (LGA 1700)
    cpu("Core i9-14900K", 24, 32, 4500, 59000),
    cpu("Core i9-14900KF", 24, 32, 4500, 59000),
    cpu("Core i7-14700K", 20, 28, 4300, 47000),
    cpu("Core i7-14700KF", 20, 28, 4300, 47000),
    cpu("Core i5-14600K", 14, 20, 4100, 33000),
    cpu("Core i5-14600KF", 14, 20, 4100, 33000),
    // Intel 13th gen (LGA 1700)
    cpu("Core i9-13900K", 24, 32, 4300, 56000),
    cpu("Core i9-13900KF", 24, 32, 4300, 56000),
    cpu("Core i7-13700K", 16, 24, 4100, 40000),
    cpu("Core i7-13700KF", 16, 24, 4100, 40000),
    cpu("Core i5-13600K", 14, 20, 3900, 30000),
    cpu("Core i5-13600KF", 14, 20, 3900, 30000),
    // Intel 12th gen (LGA 1700)
    cpu("Core i9-12900K", 16, 24, 3900, 45000),
    cpu("Core i9-12900KF", 16, 24, 3900, 45000),
    cpu("Core i7-12700K", 12, 20, 3800, 35000),
    cpu("Core i7-12700KF", 12, 20, 3800, 35000),
    cpu("Core i5-12600K", 10, 16, 3700, 27000),
    cpu("Core i5-12600KF", 10, 16, 3700, 27000),
];

fn normalize(name: &str) -> String {
    name.to_lowercase().replace('-', " ")
}

/// Find benchmark scores for a CPU name as a retailer lists it.
///
/// First pass: a table name contained in the listing (or vice versa), after
/// lowercasing and treating `-` as a space. The longest table name wins so
/// "i7-14700KF" does not resolve to "i7-14700K". Second pass: the table
/// entry's model number (last word) appears in the listing.
pub fn lookup_cpu(name: &str) -> Option<&'static CpuBenchmark> {
    let query = normalize(name);
    if query.trim().is_empty() {
        return None;
    }

    let by_name = CPU_BENCHMARKS
        .iter()
        .filter(|entry| {
            let entry_norm = normalize(entry.cpu_name);
            query.contains(&entry_norm) || entry_norm.contains(query.trim())
        })
        .max_by_key(|entry| entry.cpu_name.len());
    if by_name.is_some() {
        return by_name;
    }

    CPU_BENCHMARKS
        .iter()
        .filter(|entry| {
            entry
                .cpu_name
                .split_whitespace()
                .last()
                .map(|model| query.contains(&normalize(model)))
                .unwrap_or(false)
        })
        .max_by_key(|entry| entry.cpu_name.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_embedded_names() {
        assert_eq!(lookup_cpu("Ryzen 9 9900X").unwrap().multi_core_score, 52000);
        let b = lookup_cpu("AMD Ryzen 7 9800X3D 8-Core Processor").unwrap();
        assert_eq!(b.cpu_name, "Ryzen 7 9800X3D");
        assert_eq!(b.core_label(), "8C/16T");
    }

    #[test]
    fn dashes_and_case_are_ignored() {
        let b = lookup_cpu("intel core i7 14700k").unwrap();
        assert_eq!(b.cpu_name, "Core i7-14700K");
    }

    #[test]
    fn longest_match_wins() {
        assert_eq!(lookup_cpu("Intel Core i7-14700KF").unwrap().cpu_name, "Core i7-14700KF");
        assert_eq!(lookup_cpu("AMD Ryzen 5 9600X").unwrap().cpu_name, "Ryzen 5 9600X");
        assert_eq!(lookup_cpu("AMD Ryzen 7 9850X3D").unwrap().cpu_name, "Ryzen 7 9850X3D");
    }

    #[test]
    fn model_number_fallback() {
        let b = lookup_cpu("AMD 7800X3D Gaming CPU").unwrap();
        assert_eq!(b.cpu_name, "Ryzen 7 7800X3D");
    }

    #[test]
    fn unknown_cpu() {
        assert!(lookup_cpu("Pentium Gold G7400").is_none());
        assert!(lookup_cpu("").is_none());
    }
}
