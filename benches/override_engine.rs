use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use encoding_rs::UTF_8;
use sdg_data_filler::config::{ColumnOverrides, OverrideSpec};
use sdg_data_filler::dataset::Dataset;
use sdg_data_filler::overrides::apply_overrides;

fn generate_indicator(rows: usize) -> Dataset {
    let mut csv = String::from("Year,Sex,Age,Region,Value\n");
    for i in 0..rows {
        let sex = match i % 4 {
            0 => "Male",
            1 => "Female",
            2 => "",
            _ => "Total",
        };
        let age = match i % 5 {
            0 => "16 to 24",
            1 => "25 to 34",
            2 => "",
            3 => "65 and over",
            _ => "All ages",
        };
        let region = if i % 7 == 0 { "" } else { "North East" };
        csv.push_str(&format!("{},{sex},{age},{region},{}.5\n", 2015 + i % 8, i));
    }
    Dataset::from_csv_bytes(csv.as_bytes(), UTF_8, "bench").expect("parse generated csv")
}

fn indicator_spec(standardise: bool, fill: bool) -> OverrideSpec {
    OverrideSpec {
        standardise_cells: standardise,
        fill_gaps: fill,
        columns: [
            ("Year", ColumnOverrides::new(Vec::<(String, String)>::new(), Some("2015"))),
            (
                "Sex",
                ColumnOverrides::new([("Male", "M"), ("Female", "F")], Some("T")),
            ),
            (
                "Age",
                ColumnOverrides::new([("All ages", "All")], Some("All")),
            ),
            (
                "Region",
                ColumnOverrides::new(Vec::<(String, String)>::new(), Some("England")),
            ),
        ]
        .into_iter()
        .map(|(name, overrides)| (name.to_string(), overrides))
        .collect(),
        ..OverrideSpec::default()
    }
}

fn bench_override_engine(c: &mut Criterion) {
    let dataset = generate_indicator(50_000);
    let mut group = c.benchmark_group("apply_overrides");

    for (name, standardise, fill) in [
        ("standardise_and_fill", true, true),
        ("standardise_only", true, false),
        ("fill_only", false, true),
    ] {
        let spec = indicator_spec(standardise, fill);
        group.bench_function(name, |b| {
            b.iter_batched(
                || dataset.clone(),
                |input| apply_overrides(input, &spec).expect("apply overrides"),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_override_engine);
criterion_main!(benches);
