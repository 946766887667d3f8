fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    #[cfg(not(unix))]
    compile_error!("agentops needs unix process groups");

    // 编译时间写入版本号
    let output = std::process::Command::new("date")
        .args(&["-u", "+%Y-%m-%d %H:%M:%S UTC"])
        .output()
        .expect("failed to get build time");
    let build_time = String::from_utf8_lossy(&output.stdout).trim().to_string();
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);
}
