use std::{cell::RefCell, fs, io, path::Path, rc::Rc};

use pretty_assertions::assert_eq;

use mfp_interpreter::{
    Builtin, Environment, EvalConfig, Evaluator, FrontendError, Outcome, RuntimeError, Session,
    Value,
};
use mfp_parser::Lexer;

#[derive(Clone, Default)]
struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl io::Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedOutput {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

fn session_with(output: SharedOutput) -> Session {
    Session::new(Evaluator::new().with_output(Box::new(output)))
}

fn run(source: &str) -> Outcome {
    session_with(SharedOutput::default())
        .run_source(source, Path::new("<test>"))
        .unwrap()
}

#[test]
fn factorial_lexemes() {
    let tokens = Lexer::new("fact := n |-> if n > 0 then n*fact(n-1) else 1\n")
        .tokenise()
        .into_result()
        .unwrap();

    let lexemes: Vec<String> = tokens.iter().map(|t| t.value.to_string()).collect();
    assert_eq!(
        lexemes,
        vec![
            "fact", ":=", "n", "|->", "if", "n", ">", "0", "then", "n", "*", "fact", "(", "n",
            "-", "1", ")", "else", "1", "\n",
        ]
    );
}

#[test]
fn higher_order_division() {
    let outcome = run("a := f |-> f(0) / 2\nb := x |-> 3*x\na(b)\n");

    assert_eq!(*outcome.value, Value::Float(0.0));
    assert_eq!(outcome.value.to_string(), "0.0");
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn extending_leaves_parents_alone() {
    let base = Environment::new();
    let one = base.extend("n1", Rc::new(Value::Integer(1)));
    let two = one.extend("n2", Rc::new(Value::Integer(2)));

    assert_eq!(two.get("n1").as_deref(), Some(&Value::Integer(1)));
    assert_eq!(two.get("n2").as_deref(), Some(&Value::Integer(2)));
    assert!(!one.contains("n2"));
    assert!(base.is_empty());
}

#[test]
fn redeclaration_keeps_first_value() {
    let outcome = run("x := 1\nx := 2\nx\n");

    assert_eq!(*outcome.value, Value::Integer(1));
    assert_eq!(
        outcome.diagnostics,
        vec![RuntimeError::Redeclaration("x".into())]
    );
}

#[test]
fn if_evaluates_untaken_branch() {
    let outcome = run("if 1 > 0 then 5 else (undefined_var)");

    assert_eq!(*outcome.value, Value::Integer(5));
    assert_eq!(
        outcome.diagnostics,
        vec![RuntimeError::IdentifierNotFound("undefined_var".into())]
    );

    let output = SharedOutput::default();
    let outcome = session_with(output.clone())
        .run_source("if 0 then print(1) else print(2)", Path::new("<test>"))
        .unwrap();
    assert!(outcome.value.is_absent());
    assert_eq!(output.contents(), "1\n2\n");
}

#[test]
fn later_statements_run_after_diagnostics() {
    let output = SharedOutput::default();
    let outcome = session_with(output.clone())
        .run_source(
            "nothing := missing\nprint(nothing)\nprint(sin(0) + 1)\n",
            Path::new("<test>"),
        )
        .unwrap();

    assert_eq!(
        outcome.diagnostics,
        vec![RuntimeError::IdentifierNotFound("missing".into())]
    );
    assert_eq!(output.contents(), "absent\n1.0\n");
}

#[test]
fn self_application_hits_depth_limit() {
    let evaluator = Evaluator::new_with_builtins(
        Rc::new(Default::default()),
        EvalConfig { max_call_depth: 32 },
    );
    let outcome = Session::new(evaluator.with_output(Box::new(io::sink())))
        .run_source("w := f |-> f(f)\nw(w)\n", Path::new("<test>"))
        .unwrap();

    assert!(outcome.value.is_absent());
    assert_eq!(
        outcome.diagnostics,
        vec![RuntimeError::CallDepthExceeded(32)]
    );
}

#[test]
fn include_expands_other_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("lib")).unwrap();
    fs::write(dir.path().join("lib/square.mfp"), "square := x |-> x * x").unwrap();
    fs::write(
        dir.path().join("lib/all.mfp"),
        "!include(square.mfp)\n!include(square.mfp)\n",
    )
    .unwrap();

    let main = dir.path().join("main.mfp");
    let source = "!include(lib/all.mfp)\nsquare(7)\n";
    fs::write(&main, source).unwrap();

    let outcome = session_with(SharedOutput::default())
        .run_source(source, &main)
        .unwrap();

    assert_eq!(*outcome.value, Value::Integer(49));
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn self_include_expands_once() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.mfp");
    let source = "!include(main.mfp)\nx := 1\nx\n";
    fs::write(&main, source).unwrap();

    let outcome = session_with(SharedOutput::default())
        .run_source(source, &main)
        .unwrap();

    assert_eq!(*outcome.value, Value::Integer(1));
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn frontend_failures_abort_the_unit() {
    let output = SharedOutput::default();
    let mut session = session_with(output.clone());
    let origin = Path::new("<test>");

    let tests = vec![
        "print(1)\n!nonsense(x)\n",
        "print(1)\ny := 2 @ 3\n",
        "print(1)\ny := (2 + 3\n",
    ];

    for source in tests {
        assert!(session.run_source(source, origin).is_err(), "{:?}", source);
    }

    assert_eq!(output.contents(), "");
    assert!(session.env().is_empty());
}

#[test]
fn frontend_error_messages() {
    let mut session = Session::default();
    let origin = Path::new("prog.mfp");

    let tests = vec![
        ("!nonsense(x)", vec!["prog.mfp:1: No such macro 'nonsense'"]),
        ("x := ) 1", vec!["Unexpected token `)` (at 5:6)"]),
        (
            "a := 1 ~ 2 $",
            vec![
                "Unexpected character '~' in source (at 7:8)",
                "Unexpected character '$' in source (at 11:12)",
            ],
        ),
    ];

    for (source, expected) in tests {
        let err: FrontendError = session.run_source(source, origin).unwrap_err();
        assert_eq!(err.messages(), expected, "{:?}", source);
    }
}

#[test]
fn division_by_zero_is_a_diagnostic() {
    let output = SharedOutput::default();
    let outcome = session_with(output.clone())
        .run_source("print(1 / 0)\nprint(exp(1000))\n7 / 2\n", Path::new("<test>"))
        .unwrap();

    assert_eq!(*outcome.value, Value::Float(3.5));
    assert_eq!(
        outcome.diagnostics,
        vec![
            RuntimeError::DivisionByZero(Rc::new(Value::Integer(1))),
            RuntimeError::MathRange(Builtin::Exp, Rc::new(Value::Integer(1000))),
        ]
    );
    assert_eq!(output.contents(), "absent\nabsent\n");
}

#[test]
fn overly_deep_programs_are_rejected() {
    let mut session = Session::default();
    let origin = Path::new("<test>");

    session.run_source("x := 1", origin).unwrap();

    let long_sum = format!("y := {}\n", vec!["1"; 20_000].join(" + "));
    let err = session.run_source(&long_sum, origin).unwrap_err();
    assert!(matches!(
        err,
        FrontendError::Parse(mfp_parser::ParseError::TooDeeplyNested { .. })
    ));

    let nested = format!("{}1{}", "(".repeat(200_000), ")".repeat(200_000));
    assert!(session.run_source(&nested, origin).is_err());

    let outcome = session.run_source("x + 1", origin).unwrap();
    assert_eq!(*outcome.value, Value::Integer(2));
    assert!(!session.env().contains("y"));
}
