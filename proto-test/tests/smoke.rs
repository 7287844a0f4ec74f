use std::process::Command;

#[test]
fn reports_machine_mode() {
    let out = Command::new(env!("CARGO_BIN_EXE_proto-test"))
        .output()
        .expect("run proto-test");

    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "M bit present\n");
}
