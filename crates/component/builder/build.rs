fn main() {
    wasm_builder::build_component();
}
