#[cfg(test)]
mod property_tests {
    use frontend::{parse, rules};
    use proptest::prelude::*;

    // Strategy for generating valid identifiers (reduced complexity)
    fn valid_identifier() -> impl Strategy<Value = String> {
        "[a-z_][a-zA-Z0-9_]{0,5}".prop_filter("Not a reserved keyword", |s| {
            !matches!(
                s.as_str(),
                "if" | "else" | "while" | "func" | "return" | "print" | "int" | "double" | "bool" | "string"
                    | "true" | "false"
            )
        })
    }

    fn arithmetic() -> impl Strategy<Value = String> {
        let leaf = (0i64..1000).prop_map(|n| n.to_string());
        leaf.prop_recursive(4, 32, 2, |inner| {
            (inner.clone(), prop::sample::select(vec!["+", "-", "*", "/", "%"]), inner)
                .prop_map(|(l, op, r)| format!("({} {} {})", l, op, r))
        })
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config {
            cases: 32,
            .. proptest::test_runner::Config::default()
        })]
        #[test]
        fn prop_valid_identifiers_parse(name in valid_identifier()) {
            let input = format!("int {} = 1; print({});", name, name);
            let output = parse(&input);
            prop_assert!(output.errors.is_empty(), "Valid identifier '{}' should parse", name);
        }

        #[test]
        fn prop_arithmetic_trees_validate(expr in arithmetic()) {
            let input = format!("int x = {};", expr);
            let output = parse(&input);
            prop_assert!(output.errors.is_empty());
            prop_assert!(output.tree.validate().is_ok());
        }

        #[test]
        fn prop_every_leaf_is_positioned(expr in arithmetic()) {
            let output = parse(&format!("print({});", expr));
            for (id, _) in output.tree.walk() {
                let node = output.tree.get(id).unwrap();
                if node.is_leaf() {
                    prop_assert!(node.position.is_some());
                } else {
                    prop_assert!(node.position.is_none());
                }
            }
        }
    }

    #[test]
    fn token_stream_keeps_comments() {
        let output = parse("// leading\nint x; // trailing\n");
        let comments = output.tokens.iter().filter(|t| t.kind == frontend::TokenType::Comment).count();
        assert_eq!(comments, 2);
        let leaves = output.tree.walk().into_iter().filter(|(id, _)| output.tree.get(*id).unwrap().label.starts_with("//")).count();
        assert_eq!(leaves, 0);
        assert!(output.tree.walk().iter().any(|(id, _)| output.tree.get(*id).unwrap().label == rules::VAR_DECL));
    }
}
