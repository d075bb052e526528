/// Implements the standard arithmetic operator traits for single-field newtypes.
///
/// * `op!(binary T, Add, add)` implements `T + T`
/// * `op!(inplace T, AddAssign, add_assign)` implements `T += T`
/// * `op!(unary T, Neg, neg)` implements `-T`
#[macro_export]
macro_rules! op {
    (binary $type:ty, $trt:ident, $method:ident) => {
        impl std::ops::$trt for $type {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::ops::$trt::$method(self.0, rhs.0))
            }
        }
    };
    (inplace $type:ty, $trt:ident, $method:ident) => {
        impl std::ops::$trt for $type {
            fn $method(&mut self, rhs: Self) {
                std::ops::$trt::$method(&mut self.0, rhs.0)
            }
        }
    };
    (unary $type:ty, $trt:ident, $method:ident) => {
        impl std::ops::$trt for $type {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(std::ops::$trt::$method(self.0))
            }
        }
    };
}
