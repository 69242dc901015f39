use esindex_operator::crds::esindex::EsIndex;
use kube::core::CustomResourceExt;

fn main() {
    println!("{}", serde_yaml::to_string(&EsIndex::crd()).expect("serialize crd"));
}
