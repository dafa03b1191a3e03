use crate::inspector::detect_platform;

#[test]
fn detects_managed_distributions() {
    assert_eq!(detect_platform("v1.29.4-eks-036c24b"), "eks");
    assert_eq!(detect_platform("v1.30.2-gke.1587003"), "gke");
    assert_eq!(detect_platform("v1.30.3+k3s1"), "k3s");
    assert_eq!(detect_platform("v1.28.9+rke2r1"), "rke2");
}

#[test]
fn falls_back_to_upstream() {
    assert_eq!(detect_platform("v1.30.0"), "kubernetes");
    assert_eq!(detect_platform(""), "");
}
