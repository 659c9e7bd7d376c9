use ndarray::Array1;
use ndarray_rand::RandomExt;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand_distr::{Normal, Uniform};
use soilcast::linear_model::RankPolicy;
use soilcast::{Dataset, FeatureVector, PipelineConfig, Record, Session, io, report};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Soil Moisture Regression ===\n");

    // Stage 1: the four anonymized rows of the ETL script, written out as the
    // hand-off file the dashboard reads.
    let sample = Dataset::new(vec![
        Record::new(6.1, 250.0, 180.0, 300.0, 600.0, Some(55.2)),
        Record::new(6.4, 270.0, 175.0, 320.0, 615.0, Some(48.9)),
        Record::new(7.0, 260.0, 190.0, 310.0, 610.0, Some(62.0)),
        Record::new(5.5, 240.0, 160.0, 295.0, 590.0, Some(47.1)),
    ]);
    let handoff = std::env::temp_dir().join("dados_limpos.csv");
    io::write_csv(&Dataset::from(sample.clean()), &handoff)?;
    println!("Wrote hand-off file to {}", handoff.display());

    // Three training rows cannot pin down five coefficients.
    match Session::run(PipelineConfig::new().source(&handoff)) {
        Ok(_) => println!("Unexpected: fit succeeded"),
        Err(e) => println!("Default fit refused: {e}"),
    }
    let session = Session::run(
        PipelineConfig::new()
            .source(&handoff)
            .rank_policy(RankPolicy::MinimumNorm),
    )?;
    println!("Minimum-norm fit on the sample:\n{}\n", session.report());

    // Stage 2: a larger synthetic field log.
    let n = 200;
    let mut rng = StdRng::seed_from_u64(42);
    let ph = Array1::random_using(n, Uniform::new(5.0, 8.0), &mut rng);
    let npk_n = Array1::random_using(n, Uniform::new(200.0, 300.0), &mut rng);
    let npk_p = Array1::random_using(n, Uniform::new(150.0, 200.0), &mut rng);
    let npk_k = Array1::random_using(n, Uniform::new(280.0, 340.0), &mut rng);
    let ldr_mv = Array1::random_using(n, Uniform::new(570.0, 630.0), &mut rng);
    let noise = Array1::random_using(n, Normal::new(0.0, 2.0)?, &mut rng);

    let records: Dataset = (0..n)
        .map(|i| {
            let soil = 10.0 + 6.0 * ph[i] + 0.12 * npk_n[i] - 0.04 * npk_p[i] + 0.05 * npk_k[i]
                - 0.03 * ldr_mv[i]
                + noise[i];
            // every tenth reading lost its moisture label
            let target = if i % 10 == 9 { None } else { Some(soil) };
            Record::new(ph[i], npk_n[i], npk_p[i], npk_k[i], ldr_mv[i], target)
        })
        .collect();

    let session = Session::from_dataset(PipelineConfig::default(), records)?;
    print!("{}", report::render_session(&session));

    println!("\nLearned coefficients:");
    for (feature, weight) in session.model().features().iter().zip(session.model().coefficients()) {
        println!("  {feature:<7} {weight:>9.4}");
    }
    println!("  intercept {:>9.4}", session.model().intercept());

    println!("\nWhat-if scenarios:");
    for scenario_input in [
        report::default_scenario(),
        FeatureVector::new(5.2, 210.0, 190.0, 285.0, 625.0),
        FeatureVector::new(7.9, 295.0, 155.0, 335.0, 575.0),
    ] {
        let scenario = session.simulate(&scenario_input)?;
        print!("{}", report::render_scenario(&scenario_input, &scenario));
    }

    Ok(())
}
