fn main() {
    // ESP-IDF build environment propagation (target builds only).
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
