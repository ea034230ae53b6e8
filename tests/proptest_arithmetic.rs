//! Property-based tests for compiled arithmetic and the constant pool.
//!
//! - Compiled arithmetic and comparisons agree with evaluating the same expression on f64 directly
//! - Equal literals are interned once, and every load of them shares one index
//! - Compiling the same program twice gives identical output

use loxvm::compiler::disassemble;
use loxvm::{compile, compile_source, parse, run_str, scan, Value};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Number literals as they appear in source text, with up to three decimals
fn arb_number_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..1_000_000).prop_map(|i| i.to_string()),
        (0u32..1_000_000, 0u32..1000).prop_map(|(i, f)| format!("{i}.{f:03}")),
    ]
}

fn arb_arith_op() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("+"), Just("-"), Just("*"), Just("/")]
}

fn arb_cmp_op() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(">"), Just(">="), Just("<"), Just("<=")]
}

/// Literals of every type, drawn from a small pool so that duplicates are common
fn arb_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..5).prop_map(|i| i.to_string()),
        (0u32..3).prop_map(|i| format!("\"s{i}\"")),
        Just("true".to_string()),
        Just("false".to_string()),
        Just("nil".to_string()),
    ]
}

fn number(literal: &str) -> f64 {
    literal.parse().unwrap()
}

// =============================================================================
// Arithmetic agrees with f64
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn arithmetic_matches_f64(a in arb_number_literal(), op in arb_arith_op(), b in arb_number_literal()) {
        let (x, y) = (number(&a), number(&b));
        let expected = match op {
            "+" => x + y,
            "-" => x - y,
            "*" => x * y,
            _ => x / y,
        };

        let code = format!("print({a} {op} {b});");
        let output = run_str(&code).unwrap();
        prop_assert_eq!(output, format!("{}\n", Value::from(expected)), "program: {}", code);
    }

    #[test]
    fn comparison_matches_f64(a in arb_number_literal(), op in arb_cmp_op(), b in arb_number_literal()) {
        let (x, y) = (number(&a), number(&b));
        let expected = match op {
            ">" => x > y,
            ">=" => x >= y,
            "<" => x < y,
            _ => x <= y,
        };

        let code = format!("print({a} {op} {b});");
        prop_assert_eq!(run_str(&code).unwrap(), format!("{expected}\n"), "program: {}", code);
    }

    #[test]
    fn variables_hold_their_value(a in arb_number_literal(), b in arb_number_literal()) {
        let code = format!("var x = {a}; var y = {b}; print(x - y);");
        let expected = Value::from(number(&a) - number(&b));
        prop_assert_eq!(run_str(&code).unwrap(), format!("{expected}\n"));
    }
}

// =============================================================================
// Constant pool
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn constants_are_interned_once(literals in prop::collection::vec(arb_literal(), 1..40)) {
        let code: String = literals.iter().map(|l| format!("{l};")).collect();
        let program = compile_source(&code).unwrap();

        for (i, a) in program.constants.iter().enumerate() {
            for b in &program.constants[i + 1..] {
                prop_assert_ne!(a, b);
            }
        }

        let mut distinct = literals.clone();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(program.constants.len(), distinct.len());
    }

    #[test]
    fn equal_literals_share_an_index(literal in arb_literal()) {
        let code = format!("{literal} == {literal};");
        let program = compile_source(&code).unwrap();
        prop_assert_eq!(program.constants.len(), 1);
        prop_assert_eq!(disassemble(&program.bytecode, false), "LOAD_CONST(0) LOAD_CONST(0) EQ RETURN");
    }

    #[test]
    fn compiling_is_idempotent(literals in prop::collection::vec(arb_literal(), 0..20)) {
        let code: String = literals
            .iter()
            .enumerate()
            .map(|(i, l)| if i % 2 == 0 { format!("print({l});") } else { format!("var v = {l};") })
            .collect();
        let ast = parse(&scan(&code).tokens).unwrap();
        prop_assert_eq!(compile(&ast).unwrap(), compile(&ast).unwrap());
    }
}
