//! Small shared helpers, mostly macro plumbing for tuple-generic impls.

/// Invoke another macro once per tuple arity, peeling one type off each round.
#[macro_export]
macro_rules! each_tuple {
    ($m:ident @ $head:ident) => {
        $m!($head);
    };
    ($m:ident @ $head:ident, $($tail:ident),*) => (
        $m!($head, $( $tail ),*);
        $crate::each_tuple!($m @ $( $tail ),*);
    );
}

/// Apply a macro to every tuple arity from 1 to 26 (A through Z).
///
/// Used to implement [`Bundle`](crate::component::Bundle),
/// [`Data`](crate::query::Data) and the system parameter traits for tuples.
#[macro_export]
macro_rules! all_tuples {
    ($m:ident) => {
        $crate::each_tuple!($m @ A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z);
    };
}

#[cfg(test)]
mod tests {
    use std::marker::PhantomData;

    struct Holder<Params>(PhantomData<Params>);

    macro_rules! holder_impl {
         ($($name: ident),*) => {
            #[allow(dead_code)]
            impl<$($name),*> Holder<($($name,)*)> {
                pub fn arity(&self) -> usize {
                    [$(stringify!($name)),*].len()
                 }
            }
        }
    }

    all_tuples!(holder_impl);

    #[test]
    fn expands_for_small_and_large_arities() {
        // Given
        let two = Holder::<(u8, u16)>(PhantomData);
        let three = Holder::<(u8, u16, u32)>(PhantomData);

        // Then
        assert_eq!(two.arity(), 2);
        assert_eq!(three.arity(), 3);
    }
}
