fn main() {
    // Embedded migrations and the revision manifest are read at compile time.
    println!("cargo:rerun-if-changed=migrations");
    println!("cargo:rerun-if-changed=revisions.toml");
}
