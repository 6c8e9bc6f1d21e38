//! Exports of the Fibonacci kernel.
//!
//! The default build is a WebAssembly component exporting `fibench:kernel/kernel`.
//! With the `js` feature and without the default `component` feature the same
//! entry points are exported to a JavaScript host through `wasm-bindgen`.

#[cfg(all(feature = "component", not(feature = "js")))]
mod component {
    wit_bindgen::generate!({ world: "kernel-world" });

    struct Component;
    export!(Component);

    impl exports::fibench::kernel::kernel::Guest for Component {
        fn fib(n: u32) -> i64 {
            kernel::fib(n)
        }

        fn test(n: u32, count: u32) -> i64 {
            kernel::test(n, count)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::Component;
        use super::exports::fibench::kernel::kernel::Guest;

        #[test]
        fn exports_delegate_to_the_kernel() {
            assert_eq!(55, <Component as Guest>::fib(10));
            assert_eq!(6765, <Component as Guest>::test(20, 3));
            assert_eq!(0, <Component as Guest>::test(20, 0));
        }
    }
}

#[cfg(feature = "js")]
mod js {
    use wasm_bindgen::prelude::*;

    /// Returns a `BigInt` on the JavaScript side.
    #[wasm_bindgen]
    #[must_use]
    pub fn fib(n: u32) -> i64 {
        kernel::fib(n)
    }

    #[wasm_bindgen]
    #[must_use]
    pub fn test(n: u32, count: u32) -> i64 {
        kernel::test(n, count)
    }

    #[cfg(test)]
    mod tests {
        #[test]
        fn exports_delegate_to_the_kernel() {
            assert_eq!(55, super::fib(10));
            assert_eq!(6765, super::test(20, 3));
            assert_eq!(0, super::test(20, 0));
        }
    }
}
