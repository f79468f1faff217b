use seashell::builtin::Builtin;
use seashell::command::Command;
use seashell::config::Limits;
use seashell::error::ParseError;
use seashell::pipeline::Pipeline;
use seashell::redirect::{RedirectMode, Redirection, RedirectionSpec};

fn cmd(line: &str) -> Command {
    Command::new(line.split_whitespace().map(str::to_string).collect(), false)
}

fn build(line: &str) -> Result<Pipeline, ParseError> {
    Pipeline::build(&cmd(line), &Limits::default())
}

#[test]
fn stage_count_is_pipes_plus_one() {
    let p = build("cat f | grep x | sort -r | uniq").unwrap();
    assert_eq!(p.stages().len(), 4);
    assert!(p.has_pipe());
    assert!(!p.has_redirect());
    assert_eq!(p.stages()[2].argv, vec!["sort".to_string(), "-r".to_string()]);

    let single = build("ls -l").unwrap();
    assert_eq!(single.stages().len(), 1);
    assert!(!single.has_pipe());
}

#[test]
fn pipe_cannot_begin_or_end() {
    assert_eq!(build("| echo hi").unwrap_err(), ParseError::InvalidPipePlacement);
    assert_eq!(build("echo hi |").unwrap_err(), ParseError::InvalidPipePlacement);
    assert_eq!(build("echo a | | wc").unwrap_err(), ParseError::InvalidPipePlacement);
    assert_eq!(build("|").unwrap_err(), ParseError::InvalidPipePlacement);
}

#[test]
fn stage_bound() {
    let limits = Limits { max_stages: 3, ..Limits::default() };
    assert_eq!(Pipeline::build(&cmd("a | b | c"), &limits).unwrap().stages().len(), 3);
    assert_eq!(Pipeline::build(&cmd("a | b | c | d"), &limits).unwrap_err(), ParseError::TooManyStages { max: 3 });
}

#[test]
fn builtins_stand_alone() {
    let p = build("cd /tmp").unwrap();
    assert!(p.has_builtin());
    assert_eq!(p.builtin(), Some(Builtin::Cd));
    assert_eq!(build("exit").unwrap().builtin(), Some(Builtin::Exit));
    assert_eq!(build("cd /tmp | cat").unwrap_err(), ParseError::BuiltinInPipeline);
    assert_eq!(build("echo x | exit").unwrap_err(), ParseError::BuiltinInPipeline);
    assert_eq!(build("cd > out").unwrap_err(), ParseError::BuiltinInPipeline);
    // only the first token of a stage names a builtin
    assert_eq!(build("echo cd").unwrap().builtin(), None);
}

#[test]
fn redirect_needs_a_target() {
    assert_eq!(build("cat <").unwrap_err(), ParseError::MissingRedirectTarget { operator: "<" });
    assert_eq!(build("echo hi > >> f").unwrap_err(), ParseError::MissingRedirectTarget { operator: ">" });
    assert_eq!(build("echo hi >>").unwrap_err(), ParseError::MissingRedirectTarget { operator: ">>" });
    assert_eq!(build("> out").unwrap_err(), ParseError::MissingCommand);
}

#[test]
fn each_stage_scans_its_own_redirects() {
    let p = build("sort < in.txt | uniq >> out.txt").unwrap();
    assert!(p.has_redirect());
    let [first, last] = p.stages() else { panic!("two stages expected") };
    assert_eq!(first.redirect.input, Some(1));
    assert_eq!(first.redirect.output, None);
    assert_eq!(last.redirect.append, Some(1));
    assert_eq!(
        last.redirect.redirections(&last.argv, false, true),
        vec![Redirection { mode: RedirectMode::Append, path: "out.txt".into() }]
    );
}

#[test]
fn scan_is_idempotent_and_leaves_argv() {
    let argv: Vec<String> = "cat < a > b >> c".split_whitespace().map(str::to_string).collect();
    let before = argv.clone();
    let one = RedirectionSpec::scan(&argv);
    let two = RedirectionSpec::scan(&argv);
    assert_eq!(one, two);
    assert_eq!(argv, before);
    assert_eq!(one.exec_argv(&argv), vec!["cat".to_string()]);
}

#[test]
fn background_flag_reaches_every_stage() {
    let c = Command::new(vec!["yes".into(), "|".into(), "head".into()], true);
    let p = Pipeline::build(&c, &Limits::default()).unwrap();
    assert!(p.background());
    assert!(p.stages().iter().all(|s| s.background));
}
