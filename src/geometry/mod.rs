use num_traits::Float;


/// Euclidean distance between two points in 3d space
pub fn euclidean3<T>(x1: T, y1: T, z1: T, x2: T, y2: T, z2: T) -> T
where
    T: Float,
    {
    ((x1 - x2).powi(2) + (y1 - y2).powi(2) + (z1 - z2).powi(2)).sqrt()
}
