use conditions::ast::Expression;
use conditions::lex::TokenKind;
use conditions::{
    CompileError, Condition, Environment, EnvironmentError, Object, ObjectType, RuntimeError,
    SyntaxError, TypeError,
};

fn eval_valid(source: &str, env: &Environment) -> Object {
    let condition = Condition::compile(source).expect("condition should compile");
    condition.evaluate(env)
}

fn compile_errors(source: &str) -> Vec<CompileError> {
    Condition::compile(source)
        .expect_err("condition should not compile")
        .errors()
        .to_vec()
}

fn reparse(expression: &Expression) -> Option<Expression> {
    let (program, errors) = conditions::parse(&expression.to_string());
    assert!(errors.is_empty(), "{expression}: {errors:?}");
    program.expression
}

#[test]
fn literals_survive_a_round_trip() {
    let literals = [
        Expression::Integer(5),
        Expression::Integer(0),
        Expression::Boolean(true),
        Expression::Boolean(false),
        Expression::String("ok".into()),
        Expression::String(String::new()),
        Expression::ArrayInteger(vec![1, 2, 3]),
        Expression::ArrayString(vec!["a".into(), "b c".into()]),
        Expression::Identifier("user_name".into()),
    ];
    for literal in literals {
        assert_eq!(reparse(&literal).as_ref(), Some(&literal), "{literal}");
    }
    assert_eq!(Expression::Integer(5).to_string(), "5");
}

#[test]
fn values_without_a_source_spelling_do_not_round_trip() {
    // there is no unary minus
    assert_eq!(Expression::Integer(-5).to_string(), "-5");
    let (program, errors) = conditions::parse("-5");
    assert_eq!(program.expression, None);
    assert!(matches!(
        errors.as_slice(),
        [CompileError::Syntax(SyntaxError::NoPrefix {
            kind: TokenKind::Minus,
            ..
        })]
    ));

    let rendered = Expression::ArrayInteger(vec![-1]).to_string();
    assert_eq!(rendered, "[-1]");
    assert!(matches!(
        conditions::parse(&rendered).1.as_slice(),
        [CompileError::Syntax(SyntaxError::UnknownArrayType {
            found: TokenKind::Minus,
            ..
        })]
    ));

    // strings have no escapes, so an embedded quote ends the literal early
    let quoted = Expression::String(r#"say "hi""#.into());
    insta::assert_snapshot!(quoted.to_string(), @r#""say "hi"""#);
    assert_ne!(conditions::parse(&quoted.to_string()).0.expression, Some(quoted));
}

#[test]
fn rendered_trees_reparse() {
    let (program, errors) = conditions::parse(r#"!done || len(tags) >= 2 && role in ["a", "b"]"#);
    assert!(errors.is_empty());
    let rendered = program.to_string();
    insta::assert_snapshot!(rendered, @r#"(((!done) || (len(tags) >= 2)) && (role in ["a", "b"]))"#);
    assert_eq!(conditions::parse(&rendered).0, program);
}

#[test]
fn checking_twice_changes_nothing() {
    let (program, errors) = conditions::parse(r#"len(name) > 3 && name != "root""#);
    assert!(errors.is_empty());
    let first = conditions::check(&program);
    assert_eq!(first, (ObjectType::Boolean, vec![]));
    assert_eq!(conditions::check(&program), first);
}

#[test]
fn len() {
    let env = Environment::new();
    assert_eq!(eval_valid(r#"len("abc") == 3"#, &env), Object::Boolean(true));
    assert_eq!(eval_valid("len([1, 2, 3]) == 3", &env), Object::Boolean(true));
    assert_eq!(eval_valid(r#"len(["a"])"#, &env), Object::Integer(1));

    let errors = compile_errors("len(1)");
    assert!(matches!(
        errors.as_slice(),
        [CompileError::Type(TypeError::NoMatchingOverload { .. })]
    ));
}

#[test]
fn membership() {
    let env = Environment::new();
    assert_eq!(eval_valid("1 in [1, 2, 3]", &env), Object::Boolean(true));
    assert_eq!(eval_valid(r#""x" in ["a", "b"]"#, &env), Object::Boolean(false));

    let errors = compile_errors(r#"1 in ["a", "b"]"#);
    insta::assert_snapshot!(
        errors[0].to_string(),
        @r#"`(1 in ["a", "b"])`: right operand of in must be ARRAY_INTEGER, got ARRAY_STRING"#
    );
}

#[test]
fn conjunction_over_bindings() {
    let condition = Condition::compile(r#"a > 1 && b == "ok""#).unwrap();

    let mut env = Environment::new();
    env.set("a", 5).unwrap();
    env.set("b", "ok").unwrap();
    assert_eq!(condition.evaluate(&env), Object::Boolean(true));

    env.set("a", 0).unwrap();
    assert_eq!(condition.evaluate(&env), Object::Boolean(false));
}

#[test]
fn right_hand_errors_surface_after_a_false_left_side() {
    let mut env = Environment::new();
    env.set("a", 0).unwrap();

    let result = eval_valid("a > 1 && missing > 1", &env);
    assert_eq!(
        result,
        Object::Error(RuntimeError::IdentifierNotFound("missing".into()))
    );

    let result = eval_valid("a < 1 || 1 / 0 == 0", &env);
    assert_eq!(result, Object::Error(RuntimeError::DivisionByZero));
}

#[test]
fn unknown_identifier() {
    let result = eval_valid("undefined_name > 1", &Environment::new());
    assert!(result.is_error());
    assert!(result.to_string().contains("identifier not found"), "{result}");
}

#[test]
fn readonly_bindings() {
    let mut env = Environment::new();
    env.set_readonly("k", 1).unwrap();
    assert_eq!(
        env.set("k", 2).unwrap_err(),
        EnvironmentError::ReadOnly("k".into())
    );
    assert_eq!(env.get("k"), Some(&Object::Integer(1)));
    assert_eq!(eval_valid("k == 1", &env), Object::Boolean(true));
}

#[test]
fn array_literals_must_be_homogeneous() {
    assert!(matches!(
        compile_errors("[]").as_slice(),
        [CompileError::Syntax(SyntaxError::EmptyArray { .. })]
    ));
    assert!(matches!(
        compile_errors(r#"x in [1, "a"]"#).as_slice(),
        [CompileError::Syntax(SyntaxError::MixedArray { .. })]
    ));
}

#[test]
fn division() {
    let env = Environment::new();
    assert_eq!(eval_valid("10 / 3", &env), Object::Integer(3));
    assert_eq!(eval_valid("7 / 7 * 2", &env), Object::Integer(2));

    let result = eval_valid("10 / 0", &env);
    insta::assert_snapshot!(result.to_string(), @"ERROR: division by zero");
}

#[test]
fn only_one_expression_per_condition() {
    let errors = compile_errors("a > 1 b < 2");
    insta::assert_snapshot!(errors[0].to_string(), @"unexpected `b` after the end of the condition");
    assert_eq!(errors.len(), 1);

    assert!(Condition::compile("a > 1;").is_ok());
    assert!(Condition::compile("a > 1; b < 2").is_err());
}

#[test]
fn lone_operator_halves_do_not_parse() {
    for source in ["a = 1", "a & b", "a | b"] {
        let errors = compile_errors(source);
        assert!(
            matches!(errors.as_slice(), [CompileError::Syntax(SyntaxError::TrailingInput { .. })]),
            "{source}: {errors:?}"
        );
    }
}

#[test]
fn arithmetic_checks_and_evaluates() {
    let mut env = Environment::new();
    env.set("a", 2).unwrap();
    assert_eq!(eval_valid("a + 1 > 2", &env), Object::Boolean(true));
    assert_eq!(eval_valid(r#""ab" + "c""#, &env), Object::from("abc"));
    assert_eq!(
        eval_valid("9223372036854775807 + a", &env),
        Object::Error(RuntimeError::IntegerOverflow {
            left: i64::MAX,
            operator: conditions::ast::InfixOp::Plus,
            right: 2,
        })
    );
}

#[test]
fn wildcard_sums_stay_untyped() {
    let mut env = Environment::new();
    env.set("a", "x").unwrap();
    env.set("b", "y").unwrap();
    assert_eq!(eval_valid(r#"a + b == "xy""#, &env), Object::Boolean(true));
    assert_eq!(eval_valid(r#"(a + b) in ["xy"]"#, &env), Object::Boolean(true));

    env.set("a", 1).unwrap();
    env.set("b", 2).unwrap();
    assert_eq!(eval_valid("a + b == 3", &env), Object::Boolean(true));
}

#[test]
fn every_syntax_error_is_reported() {
    let errors = compile_errors(r#"[] && [1, "a"]"#);
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0], CompileError::Syntax(SyntaxError::EmptyArray { .. })));
    assert!(matches!(errors[1], CompileError::Syntax(SyntaxError::MixedArray { .. })));
}

#[test]
fn custom_builtins_are_used_at_run_time() {
    let mut builtins = conditions::Builtins::standard();
    builtins
        .register(
            "first",
            [conditions::Signature::new(
                [ObjectType::ArrayString],
                ObjectType::String,
            )],
            |args| match args {
                [Object::ArrayString(values)] if !values.is_empty() => {
                    Object::String(values[0].clone())
                }
                _ => RuntimeError::Custom("first wants a non-empty array".into()).into(),
            },
        )
        .unwrap();
    let condition = Condition::compile_with(r#"first(tags) == "a""#, &builtins).unwrap();
    let mut env = Environment::new();
    env.set("tags", vec!["a".to_string()]).unwrap();
    assert_eq!(condition.is_satisfied(&env), Ok(true));
}

#[test]
fn booleans_compare() {
    let env = Environment::new();
    assert_eq!(eval_valid("true == true", &env), Object::Boolean(true));
    assert_eq!(eval_valid("true != false", &env), Object::Boolean(true));
}

#[test]
fn type_errors_are_caught_before_evaluation() {
    assert!(matches!(
        compile_errors("!5").as_slice(),
        [CompileError::Type(TypeError::PrefixOperand { .. })]
    ));
    assert!(matches!(
        compile_errors("len()").as_slice(),
        [CompileError::Type(TypeError::Arity { .. })]
    ));
    assert!(matches!(
        compile_errors(r#"name ~= "^a""#).as_slice(),
        [CompileError::Type(TypeError::UnknownInfixOperator { .. })]
    ));
}

#[test]
fn identifiers_with_reserved_prefixes_are_fine() {
    let mut env = Environment::new();
    env.set("index", 3).unwrap();
    env.set("format", "x").unwrap();
    assert_eq!(eval_valid("index in [1, 2, 3]", &env), Object::Boolean(true));
    assert_eq!(eval_valid(r#"format == "x""#, &env), Object::Boolean(true));
    assert!(Condition::compile("if > 1").is_err());
}

#[test]
fn bindings_from_json() {
    let mut env = Environment::new();
    let tags = Object::try_from(serde_json::json!(["a", "b"])).unwrap();
    env.set("tags", tags).unwrap();
    assert_eq!(eval_valid("len(tags) == 2", &env), Object::Boolean(true));
}
