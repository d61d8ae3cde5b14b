use std::error::Error;

#[path = "../rng.rs"]
mod rng;

use rng::SimpleRng;

/// Per-sex growth parameters: (sex code, count, log10 a, b, T_Length/S_Length ratio).
const GROUPS: [(i64, usize, f64, f64, f64); 3] = [
    (1, 70, -1.95, 3.02, 1.17),
    (2, 80, -2.05, 3.10, 1.19),
    (9, 25, -2.00, 3.05, 1.18),
];

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut rng = SimpleRng::new(42);

    let mut lwr = csv::Writer::from_path("sample_lwr.csv")?;
    lwr.write_record(["Fish_ID", "Sex", "S_Length", "Weight"])?;
    let mut llr = csv::Writer::from_path("sample_llr.csv")?;
    llr.write_record(["Fish_ID", "Sex", "S_Length", "T_Length"])?;

    let mut id = 0u32;
    for &(sex, count, log_a, b, ratio) in &GROUPS {
        for _ in 0..count {
            id += 1;
            let s_length = rng.uniform(4.0, 22.0);
            let weight = 10f64.powf(log_a + b * s_length.log10() + rng.gauss(0.0, 0.035));
            let t_length = ratio * s_length + rng.gauss(0.0, 0.25);
            let sex = sex.to_string();
            lwr.write_record([&id.to_string(), &sex, &round2(s_length).to_string(), &round2(weight).to_string()])?;
            llr.write_record([&id.to_string(), &sex, &round2(s_length).to_string(), &round2(t_length).to_string()])?;
        }
    }

    // A mistyped weight (gross outlier), a zero total length and a blank cell.
    lwr.write_record(["900", "1", "12.40", "410.00"])?;
    llr.write_record(["901", "2", "14.10", "0"])?;
    llr.write_record(["902", "1", "", "15.30"])?;

    lwr.flush()?;
    llr.flush()?;

    println!("Wrote {id} fish (+ test rows) to sample_lwr.csv and sample_llr.csv");
    Ok(())
}
