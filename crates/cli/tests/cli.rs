use assert_cmd::Command;

#[test]
fn openapi_prints_book_routes() {
    let output = Command::cargo_bin("bookshelf")
        .unwrap()
        .arg("openapi")
        .output()
        .unwrap();

    assert!(output.status.success());
    let spec: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(spec["paths"]["/books"]["get"].is_object());
    assert!(spec["paths"]["/books/{isbn}"]["delete"].is_object());
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("bookshelf")
        .unwrap()
        .arg("reindex")
        .assert()
        .failure();
}
