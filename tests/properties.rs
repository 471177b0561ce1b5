//! Property tests: confidence bounds and deterministic output.

use proptest::prelude::*;

use readme_lens::{Config, ProjectInfo, ReadmeParser};

fn all_confidences(project: &ProjectInfo) -> Vec<f64> {
    let mut out = vec![
        project.confidence.overall,
        project.confidence.languages,
        project.confidence.commands,
        project.confidence.dependencies,
        project.confidence.testing,
        project.confidence.metadata,
    ];
    out.extend(project.confidence.custom.values().copied());
    out.extend(project.languages.iter().map(|l| l.confidence));
    out.extend(project.frameworks.iter().map(|f| f.confidence));
    out.extend(project.commands.all().map(|c| c.confidence));
    out.extend(project.dependencies.packages.iter().map(|p| p.confidence));
    out.extend(project.dependencies.package_files.iter().map(|f| f.confidence));
    out.extend(project.testing.frameworks.iter().map(|f| f.confidence));
    out.extend(project.testing.tools.iter().map(|f| f.confidence));
    out.extend(project.metadata.environment.iter().map(|e| e.confidence));
    for field in [
        &project.metadata.name,
        &project.metadata.description,
        &project.metadata.license,
        &project.metadata.repository,
    ]
    .into_iter()
    .flatten()
    {
        out.push(field.confidence);
    }
    out
}

/// Markdown-ish documents assembled from fragments the analyzers react to.
fn readme_strategy() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        Just("# title\n".to_string()),
        Just("```rust\ncargo build\n```\n".to_string()),
        Just("```js\nnpm install react@18\n```\n".to_string()),
        Just("```python\npip install flask==2.0\npytest\n```\n".to_string()),
        Just("```\ngo install\nmake\n```\n".to_string()),
        Just("Built with Django and Vue.\n".to_string()),
        Just("Licensed under MIT.\n".to_string()),
        Just("```pyhton\nprint(1)\n".to_string()),
        "[a-zA-Z `$.#\\-]{0,40}\n",
    ];
    prop::collection::vec(fragment, 0..8).prop_map(|parts| parts.join("\n"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn confidences_stay_in_unit_range(text in readme_strategy()) {
        let parser = ReadmeParser::new(Config::default()).unwrap();
        let result = parser.parse_content(&text);
        prop_assert!(result.success);
        let project = result.data.unwrap();
        for c in all_confidences(&project) {
            prop_assert!((0.0..=1.0).contains(&c), "confidence {} out of range", c);
        }
    }
}

#[test]
fn test_identical_input_serialises_identically() {
    let text = std::fs::read_to_string(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/rust_cli.md"),
    )
    .unwrap();
    let parser = ReadmeParser::new(Config::default()).unwrap();

    let first = serde_json::to_string(&parser.parse_content(&text).data).unwrap();
    let second = serde_json::to_string(&parser.parse_content(&text).data).unwrap();
    pretty_assertions::assert_eq!(first, second);

    let other = ReadmeParser::new(Config {
        parallel: Some(false),
        ..Config::default()
    })
    .unwrap();
    let sequential = serde_json::to_string(&other.parse_content(&text).data).unwrap();
    pretty_assertions::assert_eq!(first, sequential);
}
