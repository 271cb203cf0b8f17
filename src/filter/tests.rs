use super::*;
use crate::config::FilterConfig;
use std::sync::Arc;

fn build(rules: &[&str]) -> Filter {
    let builder = FilterBuilder::new();
    for rule in rules {
        builder.add_wildcard_coverage_filter(rule).unwrap();
    }
    builder.build()
}

#[test]
fn test_invalid_rules_are_rejected() {
    let invalid = [
        "Garbage",
        "+[]",
        "-[ ]",
        "[ ",
        " ]",
        "+[]]",
        "-[][",
        r"-[\]",
        r"+[X]\",
        "-[X]]",
        "+[X][",
        "-<[*]*",
        "+>[*]*",
        "+<>[*]*",
        "-[*]",
        "-[]*",
        "-<*>[*]",
        "-<*>[]*",
        "-[\u{a0}]*",
    ];

    for text in invalid {
        let builder = FilterBuilder::new();
        assert!(
            builder.add_wildcard_coverage_filter(text).is_err(),
            "Rule {:?} should be rejected",
            text
        );
        assert!(builder.build().coverage_filters().is_empty());
    }
}

#[test]
fn test_blank_assembly_is_syntax_error() {
    let builder = FilterBuilder::new();
    let err = builder.add_wildcard_coverage_filter("-[ ]*").unwrap_err();
    assert_eq!(
        err,
        FilterError::Syntax {
            text: "-[ ]*".to_string()
        }
    );
    assert!(err.to_string().contains("'-[ ]*'"));
}

#[test]
fn test_reserved_character_error_names_segment() {
    let builder = FilterBuilder::new();
    let err = builder.add_wildcard_coverage_filter("-[X]]").unwrap_err();
    assert_eq!(
        err,
        FilterError::ReservedCharacter {
            text: "]".to_string(),
            usage: PatternUsage::Class,
        }
    );
}

#[test]
fn test_valid_rules_translate_segments() {
    let cases = [
        ("+[My App]Namespace", "My App", "Namespace", true),
        ("-[System.*]Console", r"System\..*", "Console", false),
        ("+[System]Console.*", "System", r"Console\..*", true),
        ("-[System.*]Console.*", r"System\..*", r"Console\..*", false),
    ];

    for (text, assembly, class, inclusive) in cases {
        let filter = build(&[text]);
        let filters = filter.coverage_filters();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].assembly_filter(), assembly);
        assert_eq!(filters[0].class_filter(), class);
        assert_eq!(filters[0].is_inclusive(), inclusive);
    }
}

#[test]
fn test_assembly_verdicts() {
    let cases: [(&[&str], &str, bool); 8] = [
        (&[], "System.Debug", false),
        (&["-[System.*]R*"], "System.Debug", false),
        (&["-[System.*]*"], "System.Debug", false),
        (&["+[System.*]*"], "System.Debug", true),
        (&["-[mscorlib]*", "-[System.*]*", "+[*]*"], "mscorlib", false),
        (&["-[System.*]*", "+[*]*"], "mscorlib", true),
        (&["+[XYZ]*"], "XYZ", true),
        (&["+[XYZA]*"], "XYZ", false),
    ];

    for (rules, assembly, expected) in cases {
        let filter = build(rules);
        assert_eq!(
            filter.should_cover_assembly(assembly),
            expected,
            "rules {:?} on {}",
            rules,
            assembly
        );
    }
}

#[test]
fn test_class_verdicts() {
    let filter = build(&["+[*]MyApp.*", "-[*]MyApp.Generated.*"]);
    assert!(filter.should_cover_class("MyApp.Service"));
    assert!(!filter.should_cover_class("MyApp.Generated.Proxy"));
    assert!(!filter.should_cover_class("Other.Service"));
}

#[test]
fn test_default_filters() {
    let builder = FilterBuilder::new();
    builder
        .add_default_filters()
        .unwrap()
        .add_wildcard_coverage_filter("+[*]*")
        .unwrap();
    let filter = builder.build();

    assert_eq!(filter.coverage_filters().len(), 6);
    for platform in [
        "mscorlib",
        "mscorlib.resources",
        "System",
        "System.Core",
        "Microsoft.VisualBasic",
    ] {
        assert!(!filter.should_cover_assembly(platform), "{}", platform);
    }
    assert!(filter.should_cover_assembly("SystemTools"));
    assert!(filter.should_cover_assembly("Microsoft.Extensions.Logging"));
    assert!(filter.should_cover_assembly("MyApp"));
}

#[test]
fn test_default_filters_alone_cover_non_platform_assemblies() {
    let builder = FilterBuilder::new();
    builder.add_default_filters().unwrap();
    let filter = builder.build();
    assert!(filter.should_cover_assembly("MyApp"));
    assert!(!filter.should_cover_assembly("System.Xml"));
}

#[test]
fn test_regex_coverage_filter_uses_literal_segments() {
    let builder = FilterBuilder::new();
    builder.add_regex_coverage_filter(r"+[My(App|Lib)]Foo\d+").unwrap();
    let filter = builder.build();

    let coverage = &filter.coverage_filters()[0];
    assert_eq!(coverage.assembly_filter(), "My(App|Lib)");
    assert_eq!(coverage.class_filter(), r"Foo\d+");
    assert!(filter.should_cover_assembly("MyLib"));
    assert!(!filter.should_cover_assembly("MyLibrary"));
    assert!(filter.should_cover_class("Foo42"));
}

#[test]
fn test_regex_coverage_filter_parenthesised_form() {
    let builder = FilterBuilder::new();
    builder.add_regex_coverage_filter(r"-[(System\..*)](.*)").unwrap();
    let coverage = builder.build().coverage_filters()[0].clone();
    assert_eq!(coverage.assembly_filter(), r"System\..*");
    assert_eq!(coverage.class_filter(), ".*");
    assert!(!coverage.should_cover_assembly("System.IO"));
}

#[test]
fn test_regex_coverage_filter_allows_backslash() {
    let builder = FilterBuilder::new();
    assert!(builder.add_regex_coverage_filter(r"+[\w+]\w+").is_ok());
    assert!(builder.add_wildcard_coverage_filter(r"+[\w+]\w+").is_err());
}

#[test]
fn test_invalid_regex_fails_at_add_time() {
    let builder = FilterBuilder::new();
    let err = builder.add_regex_coverage_filter("+[(unclosed]*").unwrap_err();
    assert!(matches!(err, FilterError::InvalidPattern { .. }));

    let err = builder.add_regex_file_exclusion("a(").unwrap_err();
    assert!(matches!(err, FilterError::InvalidPattern { .. }));

    let filter = builder.build();
    assert!(filter.coverage_filters().is_empty());
    assert!(filter.file_filters().is_empty());
}

#[test]
fn test_wildcard_with_regex_metacharacters_fails_at_add_time() {
    let builder = FilterBuilder::new();
    let err = builder.add_wildcard_coverage_filter("+[App(]*").unwrap_err();
    assert!(matches!(err, FilterError::InvalidPattern { .. }));
}

#[test]
fn test_attribute_exclusions() {
    let builder = FilterBuilder::new();
    builder
        .add_wildcard_attribute_exclusion("*ExcludeFromCodeCoverage*")
        .unwrap()
        .add_regex_attribute_exclusion("Generated(Code)?Attribute")
        .unwrap();
    let filter = builder.build();

    assert!(filter.should_exclude_by_attribute("System.Diagnostics.ExcludeFromCodeCoverageAttribute"));
    assert!(filter.should_exclude_by_attribute("GeneratedCodeAttribute"));
    assert!(filter.should_exclude_by_attribute("GeneratedAttribute"));
    assert!(!filter.should_exclude_by_attribute("ObsoleteAttribute"));
}

#[test]
fn test_attribute_wildcard_rejects_brackets() {
    let builder = FilterBuilder::new();
    let err = builder.add_wildcard_attribute_exclusion("[Obsolete]").unwrap_err();
    assert_eq!(
        err,
        FilterError::ReservedCharacter {
            text: "[Obsolete]".to_string(),
            usage: PatternUsage::Attribute,
        }
    );
}

#[test]
fn test_file_exclusions() {
    let builder = FilterBuilder::new();
    builder
        .add_wildcard_file_exclusion("*.generated.rs")
        .unwrap()
        .add_wildcard_file_exclusion(r"src\legacy\*")
        .unwrap()
        .add_regex_file_exclusion(r".*/target/.*")
        .unwrap();
    let filter = builder.build();

    assert!(filter.should_exclude_by_file_name("schema.generated.rs"));
    assert!(filter.should_exclude_by_file_name(r"src\legacy\old.rs"));
    assert!(filter.should_exclude_by_file_name("/work/target/debug/build.rs"));
    assert!(!filter.should_exclude_by_file_name("schema.rs"));
    assert!(!filter.should_exclude_by_file_name("schemaXgenerated.rs"));
}

#[test]
fn test_build_snapshots_are_independent() {
    let builder = FilterBuilder::new();
    builder.add_wildcard_coverage_filter("+[*]*").unwrap();
    let first = builder.build();

    builder.add_wildcard_coverage_filter("-[Tests]*").unwrap();
    let second = builder.build();

    assert_eq!(first.coverage_filters().len(), 1);
    assert_eq!(second.coverage_filters().len(), 2);
    assert!(first.should_cover_assembly("Tests"));
    assert!(!second.should_cover_assembly("Tests"));
}

#[test]
fn test_snapshots_share_compiled_patterns() {
    let builder = FilterBuilder::new();
    builder.add_wildcard_coverage_filter("+[*]*").unwrap();
    let first = builder.build();
    let second = builder.build();
    assert!(Arc::ptr_eq(
        &first.coverage_filters()[0],
        &second.coverage_filters()[0]
    ));
}

#[test]
fn test_rules_keep_insertion_order() {
    let filter = build(&["+[A]*", "+[B]*", "-[C]*"]);
    let assemblies: Vec<&str> = filter
        .coverage_filters()
        .iter()
        .map(|f| f.assembly_filter())
        .collect();
    assert_eq!(assemblies, ["A", "B", "C"]);
}

#[test]
fn test_concurrent_rule_accumulation() {
    let builder = Arc::new(FilterBuilder::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let builder = builder.clone();
            std::thread::spawn(move || {
                builder
                    .add_wildcard_coverage_filter(&format!("-[Module{}]*", i))
                    .unwrap();
                builder
                    .add_wildcard_file_exclusion(&format!("file{}.rs", i))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let filter = builder.build();
    assert_eq!(filter.coverage_filters().len(), 8);
    assert_eq!(filter.file_filters().len(), 8);
    assert!(!filter.should_cover_assembly("Module3"));
    assert!(filter.should_cover_assembly("Module42"));
}

#[test]
fn test_from_config() {
    let config = FilterConfig {
        default_filters: true,
        coverage: vec!["+[*]*".to_string()],
        regex_coverage: vec![r"-[.*\.Tests](.*)".to_string()],
        exclude_by_attribute: vec!["Obsolete*".to_string()],
        regex_exclude_by_attribute: vec![],
        exclude_by_file: vec!["*.g.cs".to_string()],
        regex_exclude_by_file: vec![],
    };

    let filter = FilterBuilder::from_config(&config).unwrap().build();
    assert_eq!(filter.coverage_filters().len(), 7);
    assert!(filter.should_cover_assembly("MyApp"));
    assert!(!filter.should_cover_assembly("MyApp.Tests"));
    assert!(!filter.should_cover_assembly("System.Linq"));
    assert!(filter.should_exclude_by_attribute("ObsoleteAttribute"));
    assert!(filter.should_exclude_by_file_name("Form.g.cs"));
}

#[test]
fn test_from_config_propagates_syntax_errors() {
    let config = FilterConfig {
        coverage: vec!["Garbage".to_string()],
        ..FilterConfig::default()
    };
    assert!(matches!(
        FilterBuilder::from_config(&config),
        Err(FilterError::Syntax { .. })
    ));
}
