use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

/// Write a small synthetic catalog (observation log plus sightline tables).
#[derive(Debug, Parser)]
struct Args {
    /// Output directory; laid out the way the `sightline` binary expects.
    #[arg(long, default_value = "data")]
    out: PathBuf,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Instrument setups: name and wavelength coverage (Å).
const SETUPS: [(&str, f64, f64); 6] = [
    ("w346_blue", 3050.0, 3880.0),
    ("w437_blue", 3750.0, 5000.0),
    ("w564_redl", 4600.0, 5600.0),
    ("w564_redu", 5700.0, 6650.0),
    ("w860_redl", 6700.0, 8400.0),
    ("w860_redu", 8700.0, 10400.0),
];

const ORDERS_PER_SETUP: usize = 4;

/// Targets with a reference E(B-V) and spectral type.
const TARGETS: [(&str, f64, &str, &str); 8] = [
    ("HD164073", 0.02, "B3 III", "B2.5 III"),
    ("HD 145502", 0.24, "B2 IV", "B2 V"),
    ("HD 149757", 0.32, "O9.2 IVnn", "O9.5 V"),
    ("HD 170740", 0.48, "B2 V", "B1.5 V"),
    ("HD 183143", 1.27, "B7 Iae", "B7 Ia"),
    ("HD 23180", 0.31, "B1 III", "B1 II"),
    ("HD 103779", 0.21, "B0.5 Iab", "B0.5 II"),
    ("HD 147933", 0.45, "B2 IV", "B2 V"),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let obs_rows = write_observation_log(&args.out.join("DR4_ObsLog.csv"), &mut rng)?;
    let sightline_dir = args.out.join("sightline_data");
    fs::create_dir_all(&sightline_dir).context("creating sightline_data directory")?;
    write_reddening(&sightline_dir.join("Formatted_EBV.csv"), &mut rng)?;
    write_spectral_types(&sightline_dir.join("Targets_SpType.csv"))?;

    println!(
        "Wrote {obs_rows} observations for {} targets to {}",
        TARGETS.len(),
        args.out.display()
    );
    Ok(())
}

fn writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))
}

fn write_observation_log(path: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let mut w = writer(path)?;
    w.write_record(["Object", "DateObs", "Setting", "Order", "WaveMin", "WaveMax", "Filename"])?;

    let mut rows = 0;
    for (target, ..) in TARGETS {
        let stem = target.replace(' ', "");
        for epoch in 0..2 {
            let date = format!("2016-0{}-1{}", 3 + epoch, rng.next_u64() % 10);
            for (setup, lo, hi) in SETUPS {
                let base = format!("{stem}_{setup}_{}", date.replace('-', ""));

                let (lo_s, hi_s) = (format!("{lo:.1}"), format!("{hi:.1}"));
                let file = format!("{base}.fits");
                let record: [&str; 7] = [target, &date, setup, "ALL", &lo_s, &hi_s, &file];
                w.write_record(record)?;
                rows += 1;

                let width = (hi - lo) / ORDERS_PER_SETUP as f64;
                for order in 0..ORDERS_PER_SETUP {
                    let o_lo = lo + order as f64 * width - 5.0;
                    let o_hi = lo + (order + 1) as f64 * width + 5.0;
                    // A few orders are flagged as unusable.
                    let label = if rng.chance(0.05) {
                        "Z".to_string()
                    } else {
                        format!("O{}", order + 1)
                    };
                    let (lo_s, hi_s) = (format!("{o_lo:.1}"), format!("{o_hi:.1}"));
                    let file = format!("{base}_O{}.fits", order + 1);
                    let record: [&str; 7] = [target, &date, setup, &label, &lo_s, &hi_s, &file];
                    w.write_record(record)?;
                    rows += 1;
                }
            }
        }
    }
    w.flush()?;
    Ok(rows)
}

fn write_reddening(path: &Path, rng: &mut SimpleRng) -> Result<()> {
    let mut w = writer(path)?;
    w.write_record([
        "object",
        "value",
        "unc_lower",
        "unc_upper",
        "reference_id",
        "preferred_flag",
    ])?;
    for (target, ebv, ..) in TARGETS {
        let alt = ebv + (rng.next_f64() - 0.5) * 0.1;
        for (value, reference, preferred) in [(ebv, "1", "1"), (alt.max(0.0), "2", "0")] {
            let unc = 0.02 + rng.next_f64() * 0.03;
            let value_s = format!("{value:.3}");
            let lower_s = format!("{:.3}", (value - unc).max(0.0));
            let upper_s = format!("{:.3}", value + unc);
            let record: [&str; 6] = [target, &value_s, &lower_s, &upper_s, reference, preferred];
            w.write_record(record)?;
        }
    }
    w.flush()?;
    Ok(())
}

fn write_spectral_types(path: &Path) -> Result<()> {
    let mut w = writer(path)?;
    w.write_record(["object", "value", "reference_id", "preferred_flag"])?;
    for (target, _, preferred, alternative) in TARGETS {
        w.write_record([target, preferred, "3", "1"])?;
        w.write_record([target, alternative, "4", "0"])?;
    }
    w.flush()?;
    Ok(())
}
