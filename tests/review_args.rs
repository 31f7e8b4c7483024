use std::process::Command;

#[test]
fn review_rejects_malformed_pr_reference_before_any_network_call() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_nitpick"))
        .args(["review", "--pr", "not-a-reference"])
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("owner/repo#number"),
        "stderr should explain the expected format: {stderr}"
    );
}

#[test]
fn review_requires_a_model_credential_for_openai() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_nitpick"))
        .args(["review", "--pr", "octocat/hello-world#1"])
        .env_remove("OPENAI_API_KEY")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("No model API key configured"),
        "stderr should name the missing credential: {stderr}"
    );
}

#[test]
fn review_requires_the_pr_argument() {
    let output = Command::new(env!("CARGO_BIN_EXE_nitpick"))
        .arg("review")
        .output()
        .unwrap();

    assert!(!output.status.success());
}
